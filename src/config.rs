//! Application configuration
//!
//! Loaded from an optional YAML file, then overridden by `TWEETDNA_*`
//! environment variables, then by command-line flags. Every field has a
//! default, so an empty file (or no file) is a valid configuration.

use crate::engine::{
    EngineOptions, DEFAULT_PAGE_SIZE, DEFAULT_PER_PAGE_DELAY_MS, DEFAULT_RATE_LIMIT_BACKOFF,
};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `template_path`
pub const ENV_TEMPLATE_PATH: &str = "TWEETDNA_TEMPLATE_PATH";
/// Environment variable overriding `output_dir`
pub const ENV_OUTPUT_DIR: &str = "TWEETDNA_OUTPUT_DIR";
/// Environment variable overriding `log_level`
pub const ENV_LOG_LEVEL: &str = "TWEETDNA_LOG_LEVEL";
/// Environment variable overriding `operation_name`
pub const ENV_OPERATION: &str = "TWEETDNA_OPERATION";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the captured template is persisted
    pub template_path: PathBuf,

    /// Directory receiving JSONL exports
    pub output_dir: PathBuf,

    /// Default tracing filter directive
    pub log_level: String,

    /// GraphQL operation whose requests are captured
    pub operation_name: String,

    /// HTTP transport settings
    pub http: HttpSettings,

    /// Pagination engine settings
    pub engine: EngineSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("./data/template.json"),
            output_dir: PathBuf::from("./data/exports"),
            log_level: "info".to_string(),
            operation_name: crate::capture::DEFAULT_OPERATION.to_string(),
            http: HttpSettings::default(),
            engine: EngineSettings::default(),
        }
    }
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout
    pub timeout_secs: u64,

    /// Optional client-side request ceiling
    pub requests_per_second: Option<u32>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            requests_per_second: None,
        }
    }
}

// ============================================================================
// Engine Settings
// ============================================================================

/// Pagination engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Wait after HTTP 429 before retrying the same page
    pub rate_limit_backoff_secs: u64,

    /// Default delay between pages
    pub per_page_delay_ms: u64,

    /// `variables.count` of each request
    pub page_size: u32,

    /// Keep raw upstream objects on records
    pub include_raw: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            rate_limit_backoff_secs: DEFAULT_RATE_LIMIT_BACKOFF.as_secs(),
            per_page_delay_ms: DEFAULT_PER_PAGE_DELAY_MS,
            page_size: DEFAULT_PAGE_SIZE,
            include_raw: false,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TWEETDNA_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_TEMPLATE_PATH) {
            self.template_path = PathBuf::from(path);
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(operation) = get(ENV_OPERATION) {
            self.operation_name = operation;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.operation_name.trim().is_empty() {
            return Err(Error::config("operation_name cannot be empty"));
        }
        if self.operation_name.contains('/') {
            return Err(Error::config(format!(
                "operation_name '{}' must not contain '/'",
                self.operation_name
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::config("http.timeout_secs must be greater than 0"));
        }
        if self.http.requests_per_second == Some(0) {
            return Err(Error::config(
                "http.requests_per_second must be greater than 0 when set",
            ));
        }
        if self.engine.page_size == 0 {
            return Err(Error::config("engine.page_size must be greater than 0"));
        }
        Ok(())
    }

    /// HTTP client settings derived from this config
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder =
            HttpClientConfig::builder().timeout(Duration::from_secs(self.http.timeout_secs));
        if let Some(rps) = self.http.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        builder.build()
    }

    /// Engine options derived from this config
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::default()
            .page_size(self.engine.page_size)
            .rate_limit_backoff(Duration::from_secs(self.engine.rate_limit_backoff_secs))
            .include_raw(self.engine.include_raw)
    }
}
