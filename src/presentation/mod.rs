//! Presentation layer: rendering of results and errors, and the HTTP front end.

/// Error to status and JSON body mapping.
pub mod error_response;
/// HTML fragment rendering.
pub mod fragment;
/// HTTP front end.
pub mod server;

pub use error_response::ErrorResponse;
pub use fragment::{render_fragment, render_image};
pub use server::{router, serve};
