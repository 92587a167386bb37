//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// HTML scanning.
pub mod html;
/// HTTP fetching and page loading.
pub mod http;

pub use config::{AppConfig, CliArgs, ConfigLoader, LogLevel};
pub use html::HtmlImageScanner;
pub use http::{
    BackoffFetcher, BackoffPolicy, HttpImageFetcher, PageLoader, build_http_client,
};
