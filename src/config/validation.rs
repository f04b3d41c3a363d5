use crate::config::types::{
    ArchiveConfig, Config, ContentConfig, OutputConfig, RequestConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound on attempts per request
const MAX_RETRIES_LIMIT: u32 = 20;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_archive_config(&config.archive)?;
    validate_request_config(&config.requests)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_content_config(&config.content)?;
    validate_output_config(&config.output)?;

    if config.checkpoint.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Brings service URLs into the shape the clients expect
///
/// Replay and discovery bases are joined by string concatenation, so both must
/// end with a slash.
pub fn normalize(config: &mut Config) {
    ensure_trailing_slash(&mut config.archive.wayback_base_url);
    ensure_trailing_slash(&mut config.archive.memento_api_url);
    config.archive.target_domain = config.archive.target_domain.trim().to_lowercase();
}

fn ensure_trailing_slash(value: &mut String) {
    if !value.ends_with('/') {
        value.push('/');
    }
}

/// Validates the archive service configuration
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    validate_domain_pattern(&config.target_domain)?;
    validate_service_url("cdx-api-url", &config.cdx_api_url)?;
    validate_service_url("wayback-base-url", &config.wayback_base_url)?;
    validate_service_url("memento-api-url", &config.memento_api_url)?;
    Ok(())
}

fn validate_service_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}

/// Validates retry and timeout settings
fn validate_request_config(config: &RequestConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 || config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    if config.api_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "api_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    if config.content_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "content_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the ordered content selectors
fn validate_content_config(config: &ContentConfig) -> Result<(), ConfigError> {
    if config.selectors.is_empty() {
        return Err(ConfigError::Validation(
            "content selectors cannot be empty".to_string(),
        ));
    }

    for selector in &config.selectors {
        if selector.trim().is_empty() {
            return Err(ConfigError::InvalidSelector(
                "selector cannot be blank".to_string(),
            ));
        }

        Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if let Some(log_file) = &config.log_file {
        if log_file.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "log_file cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)?;
    } else {
        validate_domain_string(pattern)?;
    }

    Ok(())
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.org')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
