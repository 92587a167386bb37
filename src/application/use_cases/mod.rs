//! Use case implementations.

mod inline_images_use_case;
mod render_page_use_case;

pub use inline_images_use_case::InlineImagesUseCase;
pub use render_page_use_case::RenderPageUseCase;
