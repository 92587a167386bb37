//! Inlining DTOs.

use std::fmt;
use std::io::Read;

use url::Url;

use crate::domain::cancel::CancelSignal;
use crate::domain::entities::ImageTag;

/// Everything one pipeline run needs.
pub struct InlineRequest {
    /// URL the page was loaded from; image references resolve against it.
    pub page_url: Url,
    /// HTML body to scan.
    pub body: Box<dyn Read + Send>,
    /// Caller's cancellation signal.
    pub cancel: CancelSignal,
}

impl InlineRequest {
    /// Creates request that is never cancelled by the caller.
    #[must_use]
    pub fn new(page_url: Url, body: Box<dyn Read + Send>) -> Self {
        Self {
            page_url,
            body,
            cancel: CancelSignal::new(),
        }
    }

    /// Ties the request to the caller's cancellation signal.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

impl fmt::Debug for InlineRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineRequest")
            .field("page_url", &self.page_url.as_str())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// A loaded page with all of its images inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedPage {
    /// Page the images came from.
    pub page_url: Url,
    /// Rewritten images in completion order.
    pub images: Vec<ImageTag>,
}
