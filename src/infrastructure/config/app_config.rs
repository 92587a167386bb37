//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::args::CliArgs;
use crate::infrastructure::http::BackoffPolicy;

const APP_NAME: &str = "imgserver";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "imgserver";

/// Port the HTTP front end listens on by default.
pub const DEFAULT_PORT: u16 = 8888;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path. Logs go to stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// HTTP client configuration.
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry configuration for image downloads.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// HTTP front end configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest accepted image body in bytes. Unlimited when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<usize>,

    /// Largest accepted page body in bytes. Unlimited when unset.
    #[serde(
        default = "default_max_page_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_page_bytes: Option<usize>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_image_bytes: None,
            max_page_bytes: default_max_page_bytes(),
        }
    }
}

/// Exponential backoff for image downloads answered with 5xx.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retry server errors at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// First delay in milliseconds.
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    /// Growth factor between delays.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Longest single delay in milliseconds.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Total retry budget in milliseconds.
    #[serde(default = "default_max_elapsed_ms")]
    pub max_elapsed_ms: u64,
}

impl RetryConfig {
    /// Returns the backoff policy described by this section.
    #[must_use]
    pub const fn to_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            multiplier: self.multiplier,
            max_interval: Duration::from_millis(self.max_interval_ms),
            max_elapsed: Duration::from_millis(self.max_elapsed_ms),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_interval_ms: default_initial_interval_ms(),
            multiplier: default_multiplier(),
            max_interval_ms: default_max_interval_ms(),
            max_elapsed_ms: default_max_elapsed_ms(),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on concurrent image downloads. `0` means unbounded.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

/// HTTP front end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_page_bytes() -> Option<usize> {
    Some(10 * 1024 * 1024)
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn default_initial_interval_ms() -> u64 {
    100
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_interval_ms() -> u64 {
    2_000
}

fn default_max_elapsed_ms() -> u64 {
    10_000
}

fn default_max_concurrent_fetches() -> usize {
    8
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.http.timeout_secs = timeout_secs;
        }
        if let Some(max_image_bytes) = args.max_image_bytes {
            self.http.max_image_bytes = Some(max_image_bytes);
        }
        if let Some(max_page_bytes) = args.max_page_bytes {
            self.http.max_page_bytes = Some(max_page_bytes);
        }
        if let Some(listen) = args.listen {
            self.server.listen = listen;
        }
        if args.no_retry {
            self.retry.enabled = false;
        }
        if let Some(max_concurrent) = args.max_concurrent {
            self.pipeline.max_concurrent_fetches = max_concurrent;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns the concurrency bound, `None` when unbounded.
    #[must_use]
    pub const fn fetch_limit(&self) -> Option<usize> {
        match self.pipeline.max_concurrent_fetches {
            0 => None,
            limit => Some(limit),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
        }
    }
}
