//! Error types for traceval

use thiserror::Error;

/// Result type alias for traceval operations
pub type TracevalResult<T> = Result<T, TracevalError>;

/// Main error type for traceval
#[derive(Error, Debug, Clone)]
pub enum TracevalError {
    /// Configuration related errors (bad concurrency level, missing API key, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors (example payload does not match the target's shape)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request errors against the dataset/trace store
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Model invocation errors
    #[error("Model error: {0}")]
    Llm(String),

    /// A named entity could not be found in the store
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl TracevalError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a new HTTP error
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    /// Create a new model error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a new not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<anyhow::Error> for TracevalError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error.to_string())
    }
}

impl From<std::io::Error> for TracevalError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for TracevalError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<reqwest::Error> for TracevalError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}
