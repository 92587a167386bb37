//! Mapping of pipeline errors to a status and JSON body.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::errors::{INTERNAL_ERROR_STATUS, InlineError};

/// Body sent for internal failures; their details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Error";

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Status code and JSON body describing a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// 4xx for client-caused failures, 500 otherwise.
    pub status: u16,
    /// `{"error": "<description>"}`.
    pub body: String,
}

impl ErrorResponse {
    /// Builds the response for `err` and logs it at a level matching its class.
    #[must_use]
    pub fn from_error(err: &InlineError) -> Self {
        let status = err.status_code();

        if err.is_client_error() {
            info!(status, error = %err, "Request failed with client error");
            let description = err.to_string();
            return Self::new(status, &description);
        }

        if err.is_cancelled() {
            warn!(status, error = %err, "Request cancelled");
        } else {
            error!(status, error = %err, "Request failed");
        }
        Self::internal()
    }

    /// Builds the generic internal error response.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            status: INTERNAL_ERROR_STATUS,
            body: internal_body(),
        }
    }

    fn new(status: u16, description: &str) -> Self {
        match serde_json::to_string(&ErrorBody { error: description }) {
            Ok(body) => Self { status, body },
            Err(e) => {
                error!(error = %e, "Failed to serialize error body");
                Self::internal()
            }
        }
    }
}

fn internal_body() -> String {
    format!(r#"{{"error":"{INTERNAL_ERROR_MESSAGE}"}}"#)
}
