//! Domain entities.

mod fetch_task;
mod image_tag;

pub use fetch_task::FetchTask;
pub use image_tag::{AttributeName, DATA_URL_PREFIX, ImageAttribute, ImageTag};
