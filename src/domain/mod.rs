//! Domain layer with the image model, errors, and port definitions.

/// Shared cancellation signal.
pub mod cancel;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use cancel::CancelSignal;
pub use entities::{AttributeName, FetchTask, ImageAttribute, ImageTag};
pub use errors::InlineError;
pub use ports::{ImageFetcher, ImageScanner, ImageStream, PageSource};
