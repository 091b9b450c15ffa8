use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default lookup endpoint; the domain is appended as the last path segment
pub const DEFAULT_BASE_URL: &str = "https://www.beianx.cn/search/";

/// Main configuration structure for Beian-Exporter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Seconds between the end of one sweep and the start of the next
    #[serde(rename = "check-interval", default = "default_check_interval")]
    pub check_interval: u64,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Delay before each domain within a sweep, in seconds
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// Retries after the first attempt when the lookup cannot be reached
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Domains to check, in sweep order
    #[serde(default)]
    pub domains: Vec<String>,

    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub lookup: LookupConfig,
}

impl Config {
    /// Builds a configuration with default settings for the given domains
    pub fn with_domains(domains: Vec<String>) -> Self {
        Self {
            check_interval: default_check_interval(),
            request_timeout: default_request_timeout(),
            request_delay: default_request_delay(),
            max_retries: default_max_retries(),
            domains,
            rate_limit: RateLimitConfig::default(),
            server: ServerConfig::default(),
            lookup: LookupConfig::default(),
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay)
    }
}

/// Outbound request throttling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Maximum requests issued within any trailing 60 seconds
    #[serde(rename = "max-requests-per-minute", default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,

    /// Maximum requests in flight at once
    #[serde(rename = "burst-size", default = "default_burst_size")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests_per_minute(),
            burst_size: default_burst_size(),
        }
    }
}

/// HTTP listener for `/metrics` and the control API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Lookup endpoint and request pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupConfig {
    /// Search URL the domain is appended to
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Lower bound of the random delay injected before every fetch (milliseconds)
    #[serde(rename = "min-jitter-ms", default = "default_min_jitter_ms")]
    pub min_jitter_ms: u64,

    /// Upper bound of the random delay injected before every fetch (milliseconds)
    #[serde(rename = "max-jitter-ms", default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            min_jitter_ms: default_min_jitter_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

fn default_check_interval() -> u64 {
    21600
}

fn default_request_timeout() -> u64 {
    30
}

fn default_request_delay() -> u64 {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_requests_per_minute() -> u32 {
    10
}

fn default_burst_size() -> u32 {
    3
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_min_jitter_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    3000
}
