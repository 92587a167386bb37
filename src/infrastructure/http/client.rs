//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::Client;

use crate::domain::errors::InlineError;
use crate::infrastructure::config::HttpConfig;

/// Builds the connection pool shared by the page loader and image fetchers.
///
/// # Errors
/// Returns an internal error if the TLS backend cannot be initialized.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, InlineError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| InlineError::internal(format!("failed to create HTTP client: {e}")))
}
