//! Error handling for the leaderboard
//!
//! Provides a unified error type and result type for the core crate.

/// Result type alias for leaderboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the leaderboard
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The leaderboard endpoint could not be reached or answered non-2xx
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The response body does not decode to the expected leaderboard shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// Invalid request or parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Database bootstrap plan errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Service temporarily unavailable
    #[error("Resource unavailable: {0}")]
    Unavailable(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration parsing errors
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::Unavailable(_) | Error::Io(_))
    }

    /// Check if this error indicates a client-side problem
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfiguration(_)
                | Error::InvalidRequest(_)
                | Error::NotFound(_)
                | Error::Schema(_)
        )
    }

    /// Check if this error came from the leaderboard endpoint itself
    pub fn is_source_error(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::Parse(_))
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Fetch(_) => "fetch",
            Error::Parse(_) => "parse",
            Error::InvalidConfiguration(_) => "configuration",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotFound(_) => "not_found",
            Error::Schema(_) => "schema",
            Error::Unavailable(_) => "unavailable",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Config(_) => "config",
            Error::Other(_) => "other",
        }
    }

    /// Convert to HTTP status code (used by the dashboard server)
    pub fn to_http_status(&self) -> u16 {
        match self {
            Error::InvalidConfiguration(_) | Error::InvalidRequest(_) => 400,
            Error::NotFound(_) => 404,
            Error::Unavailable(_) => 503,
            Error::Fetch(_) | Error::Parse(_) => 502,
            _ => 500,
        }
    }
}
