//! Configuration module for Beian-Exporter
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! An invalid configuration is fatal: the exporter refuses to start rather
//! than run half-configured.
//!
//! # Example
//!
//! ```no_run
//! use beian_exporter::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Checking every {} seconds", config.check_interval);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, LookupConfig, RateLimitConfig, ServerConfig, DEFAULT_BASE_URL};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate_domain;
