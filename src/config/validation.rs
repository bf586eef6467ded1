use crate::config::types::{Config, DownloadConfig, HttpConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_download_config(&config.download)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates page fetching configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.max_attempts < 1 || config.max_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "http max_attempts must be between 1 and 20, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_max_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_max_ms ({}) must be >= backoff_base_ms ({})",
            config.backoff_max_ms, config.backoff_base_ms
        )));
    }

    for status in &config.retry_statuses {
        if !(400..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "retry_statuses may only contain 4xx/5xx codes, got {}",
                status
            )));
        }
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be > 0".to_string(),
        ));
    }

    if config.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates image download configuration
fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "download max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "download timeout_secs must be > 0".to_string(),
        ));
    }

    if let Some(referer) = &config.referer {
        let url = Url::parse(referer)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referer '{}': {}", referer, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Referer '{}' must use http or https",
                referer
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }

    if config.extension.is_empty() || !config.extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ConfigError::Validation(format!(
            "extension must be non-empty and alphanumeric, got '{}'",
            config.extension
        )));
    }

    Ok(())
}
