//! HTTP adapters: image fetching, retries, and page loading.

pub mod backoff;
mod client;
pub mod fetcher;
pub mod page_loader;
#[cfg(test)]
pub(crate) mod test_server;

pub use backoff::{BackoffFetcher, BackoffPolicy};
pub use client::build_http_client;
pub use fetcher::HttpImageFetcher;
pub use page_loader::{MediaType, PageLoader};
