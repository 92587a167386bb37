//! imgserver - inlines the images of an HTML page as data URLs.
//!
//! This crate scans a page for `<img>` elements, downloads every referenced
//! image concurrently, and rewrites each `src` to a base64 `data:` URL. The
//! first failure cancels all outstanding downloads. It runs once from the
//! command line or as an HTTP service answering `GET /?url=<page>`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases, services, and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer rendering results and errors.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "imgserver";
