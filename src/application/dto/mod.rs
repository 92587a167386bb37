//! Data transfer objects for the application layer.

mod inline_dto;

pub use inline_dto::{InlineRequest, InlinedPage};
