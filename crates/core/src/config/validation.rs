//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `api_url` is not an http(s) URL
    /// - `endpoint` does not start with `/`
    /// - `fields` is empty
    /// - `cache_file_name` is empty or contains a path separator
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `page_size` is 0 or exceeds 10000
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.api_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(ConfigError::Invalid {
                    field: "api_url".into(),
                    reason: format!("unsupported scheme: {}", parsed.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "api_url".into(), reason: e.to_string() }),
        }

        if !self.endpoint.starts_with('/') {
            return Err(ConfigError::Invalid { field: "endpoint".into(), reason: "must start with '/'".into() });
        }

        if self.fields.is_empty() {
            return Err(ConfigError::Invalid { field: "fields".into(), reason: "must not be empty".into() });
        }

        if self.cache_file_name.is_empty() || self.cache_file_name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "cache_file_name".into(),
                reason: "must be a bare, non-empty file name".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.page_size == 0 || self.page_size > 10_000 {
            return Err(ConfigError::Invalid { field: "page_size".into(), reason: "must be within 1..=10000".into() });
        }

        if !self.fields.contains("link") {
            tracing::warn!(fields = %self.fields.joined(), "fields do not include `link`; cached assets will not be deduplicated");
        }

        Ok(())
    }
}
