//! Codex-specific error types.

use thiserror::Error;

/// Errors specific to Codex operations.
#[derive(Debug, Error)]
pub enum CodexError {
    /// Auth file not found.
    #[error("Auth file not found: {0}")]
    AuthNotFound(String),

    /// Invalid auth file format.
    #[error("Invalid auth file: {0}")]
    InvalidAuth(String),

    /// JWT decode error.
    #[error("JWT decode error: {0}")]
    JwtError(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Failed to parse output.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No data available.
    #[error("No usage data available")]
    NoData,

    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl From<std::io::Error> for CodexError {
    fn from(e: std::io::Error) -> Self {
        CodexError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for CodexError {
    fn from(e: serde_json::Error) -> Self {
        CodexError::ParseError(e.to_string())
    }
}

impl From<reqwest::Error> for CodexError {
    fn from(e: reqwest::Error) -> Self {
        CodexError::HttpError(e.to_string())
    }
}
