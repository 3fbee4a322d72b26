//! Error types for TweetDNA Harvest
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Normal termination of a run (HTTP 404, missing or repeated cursor) is not
//! an error; see [`crate::engine::StopReason`].

use thiserror::Error;

/// Maximum number of characters of an upstream body kept in error details
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// The main error type for TweetDNA Harvest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Capture Errors
    // ============================================================================
    #[error("No request template has been captured or supplied")]
    TemplateMissing,

    #[error("Capture error: {message}")]
    Capture { message: String },

    // ============================================================================
    // HTTP / Upstream Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Export Errors
    // ============================================================================
    #[error("Export error: {message}")]
    Export { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a capture error
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    /// Create an upstream status error, truncating the body
    pub fn upstream_status(status: u16, body: impl AsRef<str>) -> Self {
        Self::UpstreamStatus {
            status,
            body: truncate_body(body.as_ref()),
        }
    }

    /// Create a GraphQL error from the messages of an `errors` array
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::GraphQl {
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create an export error
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    /// Whether this error ends a run (surfaced through the `error` event)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::UpstreamStatus { .. }
                | Error::GraphQl { .. }
                | Error::MalformedResponse { .. }
                | Error::Timeout { .. }
        )
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UpstreamStatus { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Truncate an upstream body to [`MAX_ERROR_BODY_CHARS`] characters
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Result type alias for TweetDNA Harvest
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
