//! HTTP image fetcher producing inline data URLs.

use std::io::Write;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderStringWriter;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, warn};

use crate::domain::cancel::CancelSignal;
use crate::domain::entities::{DATA_URL_PREFIX, FetchTask, ImageTag};
use crate::domain::errors::InlineError;
use crate::domain::ports::ImageFetcher;

/// Content types accepted as images start with this prefix.
const IMAGE_CONTENT_TYPE_PREFIX: &str = "image";

/// Fetches images with a shared `reqwest` client and rewrites their `src`
/// to `data:<content-type>;base64,<payload>`.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: Client,
    max_image_bytes: Option<usize>,
}

impl HttpImageFetcher {
    /// Creates fetcher on top of an existing client (connection pool).
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self {
            client,
            max_image_bytes: None,
        }
    }

    /// Limits the accepted body size. `None` disables the limit.
    #[must_use]
    pub const fn with_max_image_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_image_bytes = limit;
        self
    }

    /// Downloads the task's URL and returns the encoded data URL.
    async fn download(&self, task: &FetchTask, cancel: &CancelSignal) -> Result<String, InlineError> {
        let url = task.url();

        let mut response = cancel
            .run(self.client.get(url.clone()).send())
            .await
            .ok_or_else(|| InlineError::cancelled(format!("requesting {url}")))?
            .map_err(|source| {
                warn!(url = %url, error = %source, "Image request failed");
                InlineError::Transport {
                    url: url.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(InlineError::unexpected_status(url.as_str(), status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        if content_type.is_empty() {
            return Err(InlineError::MissingContentType {
                url: url.to_string(),
            });
        }
        if !content_type.starts_with(IMAGE_CONTENT_TYPE_PREFIX) {
            return Err(InlineError::NotAnImage {
                url: url.to_string(),
                content_type,
            });
        }

        let mut encoder = EncoderStringWriter::from_consumer(
            format!("{DATA_URL_PREFIX}{content_type};base64,"),
            &STANDARD,
        );
        let mut received = 0_usize;

        loop {
            let chunk = cancel
                .run(response.chunk())
                .await
                .ok_or_else(|| InlineError::cancelled(format!("receiving {url}")))?
                .map_err(|source| InlineError::BodyTransfer {
                    url: url.to_string(),
                    source,
                })?;
            let Some(chunk) = chunk else {
                break;
            };

            received += chunk.len();
            if let Some(limit) = self.max_image_bytes
                && received > limit
            {
                return Err(InlineError::ImageTooLarge {
                    url: url.to_string(),
                    limit,
                });
            }

            encoder
                .write_all(&chunk)
                .map_err(|e| InlineError::internal(format!("base64 encoding failed: {e}")))?;
        }

        debug!(url = %url, content_type = %content_type, bytes = received, "Image downloaded");
        Ok(encoder.into_inner())
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, task: FetchTask, cancel: CancelSignal) -> Result<ImageTag, InlineError> {
        let data_url = self.download(&task, &cancel).await?;
        Ok(task.image().replace_src(data_url))
    }
}
