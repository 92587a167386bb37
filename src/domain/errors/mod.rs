//! Domain error types.

mod inline_error;

pub use inline_error::{CLIENT_ERROR_STATUS, INTERNAL_ERROR_STATUS, InlineError};
