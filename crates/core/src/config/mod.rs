//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ASSETQ_*)
//! 2. TOML config file (if ASSETQ_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::FieldSet;

mod validation;

pub use validation::ConfigError;

/// Marker file used to locate the project root for relative cache paths.
const PROJECT_ROOT_MARKER: &str = ".gitignore";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ASSETQ_*)
/// 2. TOML config file (if ASSETQ_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the search API.
    ///
    /// Set via ASSETQ_API_URL environment variable.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Search endpoint path appended to `api_url`.
    ///
    /// Set via ASSETQ_ENDPOINT environment variable.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key sent as the `key` query parameter.
    ///
    /// Set via ASSETQ_API_KEY environment variable.
    /// Required only when a network query is issued.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Result columns requested from the API, in output order.
    ///
    /// Set via ASSETQ_FIELDS environment variable (e.g. `[link,ip,port]`).
    #[serde(default = "default_fields")]
    pub fields: FieldSet,

    /// Root directory of the per-project asset caches.
    ///
    /// Relative paths are anchored at the project root (see [`AppConfig::cache_root`]).
    /// Set via ASSETQ_TEMP_DIR environment variable.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// File name of the cached asset table inside each project directory.
    ///
    /// Set via ASSETQ_CACHE_FILE_NAME environment variable.
    #[serde(default = "default_cache_file_name")]
    pub cache_file_name: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via ASSETQ_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of assets requested per page.
    ///
    /// Set via ASSETQ_PAGE_SIZE environment variable.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ASSETQ_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_url() -> String {
    "https://fofa.info".into()
}

fn default_endpoint() -> String {
    "/api/v1/search/all".into()
}

fn default_fields() -> FieldSet {
    FieldSet::new(["link", "host", "ip", "port", "protocol", "domain", "title", "server"])
        .unwrap_or_else(|_| FieldSet::empty())
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_cache_file_name() -> String {
    "raw_assets.parquet".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    100
}

fn default_user_agent() -> String {
    concat!("assetq/", env!("CARGO_PKG_VERSION")).into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            endpoint: default_endpoint(),
            api_key: None,
            fields: default_fields(),
            temp_dir: default_temp_dir(),
            cache_file_name: default_cache_file_name(),
            timeout_ms: default_timeout_ms(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ASSETQ_`
    /// 2. TOML file from `ASSETQ_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ASSETQ_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ASSETQ_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the API key is not set.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| ConfigError::Missing {
            field: "api_key".into(),
            hint: "Set ASSETQ_API_KEY environment variable".into(),
        })
    }

    /// Resolved cache root directory.
    ///
    /// Absolute `temp_dir` values are used as-is. Relative ones are joined
    /// onto the nearest ancestor of the working directory holding a
    /// `.gitignore`, falling back to the working directory itself.
    pub fn cache_root(&self) -> PathBuf {
        if self.temp_dir.is_absolute() {
            return self.temp_dir.clone();
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match find_project_root(&cwd) {
            Some(root) => root.join(&self.temp_dir),
            None => cwd.join(&self.temp_dir),
        }
    }
}

/// Walk up from `start` to the first directory containing a `.gitignore`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_ROOT_MARKER).is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api_url, "https://fofa.info");
        assert_eq!(config.endpoint, "/api/v1/search/all");
        assert_eq!(config.temp_dir, PathBuf::from("temp"));
        assert_eq!(config.cache_file_name, "raw_assets.parquet");
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.fields.iter().next(), Some("link"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_require_api_key_missing() {
        let config = AppConfig::default();
        let result = config.require_api_key();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));

        let blank = AppConfig { api_key: Some(String::new()), ..Default::default() };
        assert!(blank.require_api_key().is_err());
    }

    #[test]
    fn test_require_api_key_present() {
        let config = AppConfig { api_key: Some("test-key".into()), ..Default::default() };
        let result = config.require_api_key();
        assert_eq!(result.unwrap(), "test-key");
    }

    #[test]
    fn test_find_project_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "temp/\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_cache_root_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig { temp_dir: dir.path().to_path_buf(), ..Default::default() };
        assert_eq!(config.cache_root(), dir.path());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assetq.toml");
        std::fs::write(&path, "api_key = \"abc\"\nfields = [\"link\", \"ip\"]\npage_size = 50\n").unwrap();

        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(&path))
            .extract()
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.fields.joined(), "link,ip");
        assert_eq!(config.page_size, 50);
        assert!(config.validate().is_ok());
    }
}
