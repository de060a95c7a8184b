//! Fetch error types.
//!
//! [`FetchError`] is the top-level taxonomy strategies and the pipeline
//! reason about. Lower-level host errors (`ProcessError`, `PtyError`,
//! `BrowserError`, `KeychainError`, `HttpError`) carry mechanism-specific
//! detail and convert into the matching `FetchError` variant.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
///
/// This is the exact seven-variant taxonomy strategies classify into.
/// [`FetchError::should_fallback`] governs whether the pipeline tries the
/// next strategy after this error.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The strategy requires authentication that hasn't been set up
    /// (no credentials present at all). Never falls back.
    #[error("authentication required for {provider}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    AuthenticationRequired {
        /// Provider the strategy was acting on behalf of.
        provider: String,
        /// Optional extra detail.
        message: Option<String>,
    },

    /// Credentials were present but rejected by the provider (HTTP 401/403
    /// or an equivalent CLI/PTY signal). Never falls back.
    #[error("invalid credentials for {0}")]
    InvalidCredentials(String),

    /// Every strategy in the pipeline was exhausted without success.
    #[error("no available strategy for {0}")]
    NoAvailableStrategy(String),

    /// A network-level failure (connection, DNS, non-auth HTTP failure).
    /// Fallback allowed.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response could not be parsed into the expected shape.
    /// Fallback allowed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A CLI binary was missing, failed to spawn, or a PTY session failed.
    /// Fallback allowed.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// The provider's API itself reported an error condition (rate limited,
    /// service unavailable, a CLI trust prompt, or a token believed expired
    /// by the product). Fallback allowed.
    #[error("api error: {0}")]
    ApiError(String),
}

impl FetchError {
    /// Whether the pipeline should try the next strategy after this error.
    ///
    /// `false` only for [`FetchError::AuthenticationRequired`] and
    /// [`FetchError::InvalidCredentials`] - both indicate a configuration
    /// problem that retrying via a different mechanism won't fix.
    pub fn should_fallback(&self) -> bool {
        !matches!(
            self,
            FetchError::AuthenticationRequired { .. } | FetchError::InvalidCredentials(_)
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::ParseError(err.to_string())
    }
}

impl From<quotawatch_core::CoreError> for FetchError {
    fn from(err: quotawatch_core::CoreError) -> Self {
        FetchError::ParseError(err.to_string())
    }
}

impl From<KeychainError> for FetchError {
    fn from(err: KeychainError) -> Self {
        match err {
            KeychainError::NotFound { .. } => {
                FetchError::AuthenticationRequired {
                    provider: "unknown".to_string(),
                    message: Some(err.to_string()),
                }
            }
            other => FetchError::CommandFailed(other.to_string()),
        }
    }
}

impl From<ProcessError> for FetchError {
    fn from(err: ProcessError) -> Self {
        FetchError::CommandFailed(err.to_string())
    }
}

impl From<PtyError> for FetchError {
    fn from(err: PtyError) -> Self {
        FetchError::CommandFailed(err.to_string())
    }
}

impl From<BrowserError> for FetchError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::NoCookiesFound(_) => FetchError::AuthenticationRequired {
                provider: "unknown".to_string(),
                message: Some(err.to_string()),
            },
            other => FetchError::CommandFailed(other.to_string()),
        }
    }
}

impl From<HttpError> for FetchError {
    fn from(err: HttpError) -> Self {
        FetchError::NetworkError(err.to_string())
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}

// ============================================================================
// Keychain Error
// ============================================================================

/// Error type for keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Credential not found.
    #[error("Credential not found for {service}/{account}")]
    NotFound {
        /// Service name.
        service: String,
        /// Account name.
        account: String,
    },

    /// Access denied.
    #[error("Access denied to keychain")]
    AccessDenied,

    /// Keychain unavailable.
    #[error("Keychain unavailable: {0}")]
    Unavailable(String),

    /// Platform error.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Generic error.
    #[error("Keychain error: {0}")]
    Other(String),
}

impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => KeychainError::NotFound {
                service: String::new(),
                account: String::new(),
            },
            keyring::Error::Ambiguous(_) => {
                KeychainError::Other("Ambiguous credential entry".to_string())
            }
            keyring::Error::PlatformFailure(e) => KeychainError::Platform(e.to_string()),
            keyring::Error::NoStorageAccess(_) => KeychainError::AccessDenied,
            _ => KeychainError::Other(err.to_string()),
        }
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for shell/process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Command timed out.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit code.
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code from the process.
        code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// PTY Error
// ============================================================================

/// Error type for PTY session operations.
#[derive(Debug, Error)]
pub enum PtyError {
    /// Command not found / CLI not installed.
    #[error("binary not installed: {0}")]
    NotInstalled(String),

    /// Failed to launch the PTY child process.
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    /// An I/O failure occurred while reading or writing the PTY.
    #[error("IO failed: {0}")]
    IoFailed(String),

    /// The child process exited before the capture completed.
    #[error("process exited unexpectedly (code {0:?})")]
    ProcessExited(Option<i32>),

    /// Neither a stop substring nor the idle timeout were hit in time.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<std::io::Error> for PtyError {
    fn from(err: std::io::Error) -> Self {
        PtyError::IoFailed(err.to_string())
    }
}

// ============================================================================
// Browser Error
// ============================================================================

/// Error type for browser cookie operations.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Browser not installed / no matching profile directory.
    #[error("Browser not found: {0}")]
    BrowserNotFound(String),

    /// The browser kind is not a supported Chromium-family browser.
    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),

    /// Cookie database not found.
    #[error("Cookie database not found for {browser}: {path}")]
    DatabaseNotFound {
        /// Browser name.
        browser: String,
        /// Expected database path.
        path: String,
    },

    /// The OS credential store denied access to the Safe Storage password.
    #[error("access denied reading Safe Storage password (check Full Disk Access): {0}")]
    AccessDenied(String),

    /// Failed to read cookies from the database.
    #[error("Failed to read cookies: {0}")]
    ReadFailed(String),

    /// No cookies found for domain.
    #[error("No cookies found for domain: {0}")]
    NoCookiesFound(String),

    /// Cookie decryption failed.
    #[error("Cookie decryption failed: {0}")]
    DecryptionFailed(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No Chromium-family browser is installed at all.
    #[error("no supported browser found")]
    NoBrowsersAvailable,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_required_never_falls_back() {
        let err = FetchError::AuthenticationRequired {
            provider: "claude".to_string(),
            message: None,
        };
        assert!(!err.should_fallback());
    }

    #[test]
    fn test_invalid_credentials_never_falls_back() {
        let err = FetchError::InvalidCredentials("claude".to_string());
        assert!(!err.should_fallback());
    }

    #[test]
    fn test_network_error_falls_back() {
        assert!(FetchError::NetworkError("boom".to_string()).should_fallback());
        assert!(FetchError::ParseError("boom".to_string()).should_fallback());
        assert!(FetchError::CommandFailed("boom".to_string()).should_fallback());
        assert!(FetchError::ApiError("boom".to_string()).should_fallback());
    }

    #[test]
    fn test_no_available_strategy_falls_back_has_no_further_meaning() {
        // NoAvailableStrategy only ever appears as the pipeline's terminal
        // error, so should_fallback() on it is moot, but it must still
        // report a sane default rather than panicking.
        assert!(FetchError::NoAvailableStrategy("claude".to_string()).should_fallback());
    }
}
