//! HTML scanning adapters.

pub mod scanner;

pub use scanner::HtmlImageScanner;
