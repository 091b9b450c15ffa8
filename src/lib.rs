//! Beian-Exporter: ICP registration status as Prometheus metrics
//!
//! This crate periodically looks up a configured set of domains on a public
//! ICP registration search site, parses the registration records out of the
//! returned HTML, and exports the result as labeled gauges and counters.

pub mod config;
pub mod exporter;
pub mod lookup;
pub mod metrics;
pub mod server;
pub mod state;

use thiserror::Error;

/// Main error type for Beian-Exporter startup and wiring
///
/// Per-domain check failures are never errors; they are reported as
/// [`CheckResult`] values. This type only covers conditions that stop the
/// process from starting or serving.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid listen address '{addr}': {message}")]
    ListenAddr { addr: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// Result type alias for Beian-Exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use exporter::Exporter;
pub use lookup::{Checker, RateLimiter, RetryPolicy, Scheduler};
pub use metrics::{MetricsSink, PrometheusRegistry};
pub use state::{CheckResult, CheckStatus, RegistrationRecord, SweepState};
