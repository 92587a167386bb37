//! Coded errors raised while inlining page images.

use thiserror::Error;

/// Status reported for client-caused failures.
pub const CLIENT_ERROR_STATUS: u16 = 400;

/// Status reported for internal and transport failures.
pub const INTERNAL_ERROR_STATUS: u16 = 500;

/// Failure of any pipeline stage.
///
/// Every variant is classified either as client-caused (bad markup, bad
/// references, unusable upstream responses) or internal (transport,
/// cancellation, scan machinery). See [`InlineError::status_code`].
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum InlineError {
    #[error("no src attribute for <img/> tag")]
    MissingSource,

    #[error("invalid img tag src URL '{reference}': {reason}")]
    InvalidSource { reference: String, reason: String },

    #[error("invalid image URL: {url}")]
    InvalidImageUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("expected status code 200 but found {status} on image: {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("no content-type on image: {url}")]
    MissingContentType { url: String },

    #[error("not image content-type '{content_type}' on image: {url}")]
    NotAnImage { url: String, content_type: String },

    #[error("image larger than {limit} bytes: {url}")]
    ImageTooLarge { url: String, limit: usize },

    #[error("invalid page URL '{url}': {reason}")]
    InvalidPageUrl { url: String, reason: String },

    #[error("expected status code 200 but found {status} on requested page")]
    PageStatus { status: u16 },

    #[error("illegal content-type on requested page: {content_type}")]
    NotHtml { content_type: String },

    #[error("requested page has unsupported charset: {charset}")]
    UnsupportedCharset { charset: String },

    #[error("requested page body has invalid {charset} sequence")]
    InvalidEncoding { charset: String },

    #[error("requested page larger than {limit} bytes")]
    PageTooLarge { limit: usize },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: &'static str },

    #[error("can't fetch {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("body transfer failed: {url}")]
    BodyTransfer {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cancelled while {stage}")]
    Cancelled { stage: String },

    #[error("failed to read page body")]
    ReadInput {
        #[source]
        source: std::io::Error,
    },

    #[error("html scan failed: {message}")]
    Scan { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl InlineError {
    /// Creates invalid source error.
    #[must_use]
    pub fn invalid_source(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Creates unexpected status error.
    #[must_use]
    pub fn unexpected_status(url: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates cancellation error.
    #[must_use]
    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    /// Creates scan error.
    #[must_use]
    pub fn scan(message: impl Into<String>) -> Self {
        Self::Scan {
            message: message.into(),
        }
    }

    /// Creates internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns whether the failure was caused by the request or the page.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSource
                | Self::InvalidSource { .. }
                | Self::InvalidImageUrl { .. }
                | Self::UnexpectedStatus { .. }
                | Self::MissingContentType { .. }
                | Self::NotAnImage { .. }
                | Self::ImageTooLarge { .. }
                | Self::InvalidPageUrl { .. }
                | Self::PageStatus { .. }
                | Self::NotHtml { .. }
                | Self::UnsupportedCharset { .. }
                | Self::InvalidEncoding { .. }
                | Self::PageTooLarge { .. }
                | Self::InvalidQuery { .. }
        )
    }

    /// Returns the HTTP-like status code for this failure.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        if self.is_client_error() {
            CLIENT_ERROR_STATUS
        } else {
            INTERNAL_ERROR_STATUS
        }
    }

    /// Returns whether the upstream answered with a server error.
    ///
    /// Only these failures are worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UnexpectedStatus { status, .. } if *status >= 500 && *status <= 599)
    }

    /// Returns whether the failure came from cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(InlineError::MissingSource, 400 ; "missing_source")]
    #[test_case(InlineError::invalid_source("%%", "bad escape"), 400 ; "invalid_source")]
    #[test_case(InlineError::unexpected_status("https://x/a.png", 404), 400 ; "not_found")]
    #[test_case(InlineError::unexpected_status("https://x/a.png", 503), 400 ; "upstream_unavailable")]
    #[test_case(InlineError::MissingContentType { url: "u".into() }, 400 ; "missing_content_type")]
    #[test_case(InlineError::InvalidEncoding { charset: "windows-1251".into() }, 400 ; "invalid_encoding")]
    #[test_case(InlineError::PageTooLarge { limit: 10 }, 400 ; "page_too_large")]
    #[test_case(InlineError::InvalidQuery { reason: "too many url params" }, 400 ; "invalid_query")]
    #[test_case(InlineError::cancelled("fetching"), 500 ; "cancelled")]
    #[test_case(InlineError::scan("broken"), 500 ; "scan")]
    #[test_case(InlineError::internal("panic"), 500 ; "internal")]
    fn test_status_code(error: InlineError, expected: u16) {
        assert_eq!(error.status_code(), expected);
    }

    #[test]
    fn test_only_server_statuses_are_retryable() {
        assert!(InlineError::unexpected_status("u", 500).is_retryable());
        assert!(InlineError::unexpected_status("u", 503).is_retryable());
        assert!(!InlineError::unexpected_status("u", 404).is_retryable());
        assert!(!InlineError::unexpected_status("u", 302).is_retryable());
        assert!(!InlineError::MissingSource.is_retryable());
        assert!(!InlineError::cancelled("x").is_retryable());
    }

    #[test]
    fn test_description_mentions_status_and_url() {
        let error = InlineError::unexpected_status("https://x/a.png", 404);
        let message = error.to_string();

        assert!(message.contains("404"));
        assert!(message.contains("https://x/a.png"));
    }
}
