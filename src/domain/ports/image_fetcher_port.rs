//! Port for fetching and inlining a single image.

use async_trait::async_trait;

use crate::domain::cancel::CancelSignal;
use crate::domain::entities::{FetchTask, ImageTag};
use crate::domain::errors::InlineError;

/// Port for image fetchers.
///
/// A call yields exactly one outcome: the image with its `src` replaced by an
/// inline data URL, or the error that prevented it. Cancellation is reported
/// as [`InlineError::Cancelled`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetches the task's URL and returns the rewritten image.
    async fn fetch(&self, task: FetchTask, cancel: CancelSignal) -> Result<ImageTag, InlineError>;
}
