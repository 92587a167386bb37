//! Application layer with use cases, services, and DTOs.

/// Data transfer objects.
pub mod dto;
/// Stateless application services.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use dto::{InlineRequest, InlinedPage};
pub use use_cases::{InlineImagesUseCase, RenderPageUseCase};
