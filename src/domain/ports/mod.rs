mod image_fetcher_port;
mod image_scanner_port;
mod page_source_port;

pub use image_fetcher_port::ImageFetcher;
pub use image_scanner_port::{ImageScanner, ImageStream, ScanItem};
pub use page_source_port::PageSource;

#[cfg(test)]
pub use image_fetcher_port::MockImageFetcher;
#[cfg(test)]
pub use page_source_port::MockPageSource;
