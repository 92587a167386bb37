//! Port for loading the page to process.

use async_trait::async_trait;
use url::Url;

use crate::domain::cancel::CancelSignal;
use crate::domain::errors::InlineError;

/// Port for page sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Loads the page at `page_url` and returns its UTF-8 text.
    async fn load(&self, page_url: &Url, cancel: &CancelSignal) -> Result<String, InlineError>;
}
