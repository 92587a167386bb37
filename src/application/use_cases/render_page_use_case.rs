//! Page-level use case: load a page and inline all of its images.

use std::io::Cursor;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::InlineImagesUseCase;
use crate::application::dto::{InlineRequest, InlinedPage};
use crate::domain::cancel::CancelSignal;
use crate::domain::errors::InlineError;
use crate::domain::ports::PageSource;

const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// Loads a page by URL and runs the inlining pipeline over its body.
#[derive(Clone)]
pub struct RenderPageUseCase {
    pages: Arc<dyn PageSource>,
    inliner: InlineImagesUseCase,
}

impl RenderPageUseCase {
    /// Creates new render page use case.
    #[must_use]
    pub fn new(pages: Arc<dyn PageSource>, inliner: InlineImagesUseCase) -> Self {
        Self { pages, inliner }
    }

    /// Loads `page_url` and inlines every image on it.
    ///
    /// # Errors
    /// Returns a client error for an unusable URL or page, otherwise whatever
    /// the pipeline fails with.
    pub async fn execute(
        &self,
        page_url: &str,
        cancel: CancelSignal,
    ) -> Result<InlinedPage, InlineError> {
        let page_url = parse_page_url(page_url)?;
        let body = self.pages.load(&page_url, &cancel).await?;
        debug!(url = %page_url, bytes = body.len(), "Scanning page");

        let request = InlineRequest::new(page_url.clone(), Box::new(Cursor::new(body.into_bytes())))
            .with_cancel(cancel);
        let images = self.inliner.execute(request).await?;

        Ok(InlinedPage { page_url, images })
    }
}

/// Accepts absolute `http`/`https` URLs only.
fn parse_page_url(raw: &str) -> Result<Url, InlineError> {
    let invalid = |reason: String| InlineError::InvalidPageUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}
