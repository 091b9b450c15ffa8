use crate::config::types::{Config, LookupConfig, RateLimitConfig, ServerConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_schedule(config)?;
    validate_rate_limit(&config.rate_limit)?;
    validate_domains(&config.domains)?;
    validate_server(&config.server)?;
    validate_lookup(&config.lookup)?;
    Ok(())
}

/// Validates the sweep timing settings
fn validate_schedule(config: &Config) -> Result<(), ConfigError> {
    if config.check_interval < 60 {
        return Err(ConfigError::Validation(format!(
            "check_interval must be >= 60 seconds, got {}",
            config.check_interval
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1 second, got {}",
            config.request_timeout
        )));
    }

    // request_delay and max_retries are unsigned, so >= 0 always holds

    Ok(())
}

/// Validates rate limit configuration
fn validate_rate_limit(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.max_requests_per_minute < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests_per_minute must be >= 1, got {}",
            config.max_requests_per_minute
        )));
    }

    if config.burst_size < 1 {
        return Err(ConfigError::Validation(format!(
            "burst_size must be >= 1, got {}",
            config.burst_size
        )));
    }

    Ok(())
}

/// Validates the monitored domain list
fn validate_domains(domains: &[String]) -> Result<(), ConfigError> {
    if domains.is_empty() {
        return Err(ConfigError::Validation(
            "domains cannot be empty".to_string(),
        ));
    }

    for domain in domains {
        validate_domain(domain)?;
    }

    Ok(())
}

fn validate_server(config: &ServerConfig) -> Result<(), ConfigError> {
    config.listen.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid listen address '{}': {}", config.listen, e))
    })?;
    Ok(())
}

fn validate_lookup(config: &LookupConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.min_jitter_ms > config.max_jitter_ms {
        return Err(ConfigError::Validation(format!(
            "min_jitter_ms ({}) cannot exceed max_jitter_ms ({})",
            config.min_jitter_ms, config.max_jitter_ms
        )));
    }

    Ok(())
}

/// Validates a single domain name
pub fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if domain.len() > 253 {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' exceeds 253 characters",
            domain
        )));
    }

    // Check for invalid characters
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    // Check that it doesn't start or end with a dot or hyphen
    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    // Check for consecutive dots
    if domain.contains("..") {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // Must contain at least one dot (e.g., example.cn, not just "example")
    if !domain.contains('.') {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.cn')",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::with_domains(vec!["example.cn".to_string()])
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_domain_list_rejected() {
        let config = Config::with_domains(vec![]);
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_check_interval_lower_bound() {
        let mut config = valid_config();
        config.check_interval = 59;
        assert!(validate(&config).is_err());

        config.check_interval = 60;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_request_timeout_lower_bound() {
        let mut config = valid_config();
        config.request_timeout = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_delay_and_retries_allowed() {
        let mut config = valid_config();
        config.request_delay = 0;
        config.max_retries = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rate_limit_bounds() {
        let mut config = valid_config();
        config.rate_limit.max_requests_per_minute = 0;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.rate_limit.burst_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_listen_address() {
        let mut config = valid_config();
        config.server.listen = "not an address".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = valid_config();
        config.lookup.base_url = "ftp://example.com/".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.lookup.base_url = "::not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_jitter_range_order() {
        let mut config = valid_config();
        config.lookup.min_jitter_ms = 5000;
        config.lookup.max_jitter_ms = 1000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("example.cn").is_ok());
        assert!(validate_domain("sub.example.com.cn").is_ok());
        assert!(validate_domain("例子.中国").is_ok());

        assert!(validate_domain("").is_err());
        assert!(validate_domain("example").is_err());
        assert!(validate_domain(".example.cn").is_err());
        assert!(validate_domain("example.cn.").is_err());
        assert!(validate_domain("exa mple.cn").is_err());
        assert!(validate_domain("example..cn").is_err());
        assert!(validate_domain("example.cn/path").is_err());
    }
}
