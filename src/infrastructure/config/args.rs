//! Command-line arguments.

use super::app_config::LogLevel;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line arguments; every option overrides the config file.
#[derive(Debug, Parser)]
#[command(
    name = "imgserver",
    version,
    about = "Inline every image of an HTML page as a data URL",
    long_about = None
)]
pub struct CliArgs {
    /// Page whose images are inlined.
    #[arg(value_name = "URL", required_unless_present = "serve", conflicts_with = "serve")]
    pub url: Option<String>,

    /// Serve `GET /?url=<page>` over HTTP instead of handling one page.
    #[arg(long)]
    pub serve: bool,

    /// Address the HTTP front end listens on.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Largest accepted image in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_image_bytes: Option<usize>,

    /// Largest accepted page in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_page_bytes: Option<usize>,

    /// Do not retry images answered with a server error.
    #[arg(long)]
    pub no_retry: bool,

    /// Concurrent image downloads (0 = unbounded).
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,
}
