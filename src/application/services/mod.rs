pub mod url_resolver;

pub use url_resolver::{folder_url, resolve};
