//! Resolved fetch task.

use url::Url;

use super::ImageTag;

/// An image paired with the absolute URL it will be fetched from.
///
/// Owned by exactly one worker for the duration of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    image: ImageTag,
    url: Url,
}

impl FetchTask {
    /// Creates a task.
    #[must_use]
    pub const fn new(image: ImageTag, url: Url) -> Self {
        Self { image, url }
    }

    /// Returns the scanned image.
    #[must_use]
    pub const fn image(&self) -> &ImageTag {
        &self.image
    }

    /// Returns the resolved URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}
