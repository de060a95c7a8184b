//! Codex (ChatGPT backend) API client for OAuth-based usage fetching.
//!
//! # API Endpoint
//!
//! ```text
//! GET https://chatgpt.com/backend-api/wham/usage
//! Authorization: Bearer <access_token>
//! ChatGPT-Account-Id: <account_id>   (optional)
//! ```

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::auth::CodexCredentials;
use super::error::CodexError;

/// Base URL for the ChatGPT backend API.
pub const API_BASE_URL: &str = "https://chatgpt.com";

/// Usage endpoint.
pub const USAGE_ENDPOINT: &str = "/backend-api/wham/usage";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from the wham usage endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageApiResponse {
    /// Rate limit windows.
    pub rate_limit: Option<RateLimit>,
    /// Credit balance, present for API-key-billed accounts.
    pub credits: Option<Credits>,
}

/// Rate limit container.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimit {
    /// Primary (short) window, typically 5 hours.
    pub primary_window: Option<RateLimitWindow>,
    /// Secondary (long) window, typically weekly.
    pub secondary_window: Option<RateLimitWindow>,
}

/// A single rate limit window.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitWindow {
    /// Usage percentage (0-100).
    pub used_percent: f64,
    /// Reset time as a Unix timestamp in seconds.
    pub reset_at: Option<i64>,
    /// Window duration in seconds.
    pub limit_window_seconds: Option<i64>,
}

/// Credit balance information.
#[derive(Debug, Clone, Deserialize)]
pub struct Credits {
    /// Whether usage is unlimited (no rate-limited windows apply).
    #[serde(default)]
    pub unlimited: bool,
    /// Remaining balance in USD, when not unlimited.
    pub balance: Option<f64>,
}

// ============================================================================
// API Client
// ============================================================================

/// Codex API client for fetching usage data from the ChatGPT backend.
#[derive(Debug, Clone)]
pub struct CodexApiClient {
    base_url: String,
}

impl Default for CodexApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CodexApiClient {
    /// Create a new API client.
    pub fn new() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Create a client with a custom base URL.
    #[allow(dead_code)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Fetch usage data using resolved bearer credentials.
    #[instrument(skip(self, credentials))]
    pub async fn fetch_usage(
        &self,
        credentials: &CodexCredentials,
    ) -> Result<UsageApiResponse, CodexError> {
        let url = format!("{}{}", self.base_url, USAGE_ENDPOINT);

        debug!(url = %url, "Fetching Codex usage from API");

        let client = reqwest::Client::new();
        let mut request = client
            .get(&url)
            .header("Authorization", format!("Bearer {}", credentials.access_token));

        if let Some(ref account_id) = credentials.account_id {
            request = request.header("ChatGPT-Account-Id", account_id.clone());
        }

        let response = request.send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CodexError::AuthenticationFailed(
                "Bearer token rejected".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Codex API request failed");
            return Err(CodexError::ApiError(format!(
                "API returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        debug!(len = body.len(), "Received Codex API response");

        let usage: UsageApiResponse = serde_json::from_str(&body)
            .map_err(|e| CodexError::ParseError(format!("Failed to parse response: {}", e)))?;

        Ok(usage)
    }
}

// ============================================================================
// Conversion to Core Types
// ============================================================================

impl UsageApiResponse {
    /// Convert to a UsageSnapshot.
    pub fn to_snapshot(&self) -> quotawatch_core::UsageSnapshot {
        use quotawatch_core::FetchSource;

        let mut snapshot = quotawatch_core::UsageSnapshot::new(quotawatch_core::ProviderKind::Codex);
        snapshot.fetch_source = FetchSource::OAuth;

        match (&self.rate_limit, &self.credits) {
            (Some(rate_limit), _) => {
                if let Some(ref primary) = rate_limit.primary_window {
                    snapshot.primary = Some(primary.to_rate_window());
                }
                if let Some(ref secondary) = rate_limit.secondary_window {
                    snapshot.secondary = Some(secondary.to_rate_window());
                }
            }
            (None, Some(credits)) if credits.unlimited => {
                snapshot.primary = Some(quotawatch_core::UsageWindow {
                    used_percent: 0.0,
                    label: Some("Unlimited".to_string()),
                    ..Default::default()
                });
            }
            (None, Some(credits)) => {
                if let Some(balance) = credits.balance {
                    snapshot.primary = Some(quotawatch_core::UsageWindow {
                        used_percent: 0.0,
                        label: Some(format!("Credits: ${:.2}", balance)),
                        ..Default::default()
                    });
                }
            }
            (None, None) => {}
        }

        snapshot
    }
}

impl RateLimitWindow {
    fn to_rate_window(&self) -> quotawatch_core::UsageWindow {
        quotawatch_core::UsageWindow {
            used_percent: self.used_percent,
            window_minutes: self.limit_window_seconds.map(|s| (s / 60) as u32),
            resets_at: self
                .reset_at
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_limit_response() {
        let json = r#"{
            "rate_limit": {
                "primary_window": {
                    "used_percent": 42.0,
                    "reset_at": 1735732800,
                    "limit_window_seconds": 18000
                },
                "secondary_window": {
                    "used_percent": 10.0,
                    "reset_at": 1736337600,
                    "limit_window_seconds": 604800
                }
            }
        }"#;

        let response: UsageApiResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();

        let primary = snapshot.primary.unwrap();
        assert!((primary.used_percent - 42.0).abs() < 0.01);
        assert_eq!(primary.window_minutes, Some(300));

        let secondary = snapshot.secondary.unwrap();
        assert!((secondary.used_percent - 10.0).abs() < 0.01);
        assert_eq!(secondary.window_minutes, Some(10080));
    }

    #[test]
    fn test_unlimited_credits_response() {
        let json = r#"{"credits": {"unlimited": true}}"#;
        let response: UsageApiResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();

        let primary = snapshot.primary.unwrap();
        assert_eq!(primary.used_percent, 0.0);
        assert_eq!(primary.label, Some("Unlimited".to_string()));
    }

    #[test]
    fn test_balance_credits_response() {
        let json = r#"{"credits": {"unlimited": false, "balance": 12.5}}"#;
        let response: UsageApiResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();

        let primary = snapshot.primary.unwrap();
        assert_eq!(primary.label, Some("Credits: $12.50".to_string()));
    }

    #[test]
    fn test_empty_response() {
        let json = r#"{}"#;
        let response: UsageApiResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();
        assert!(snapshot.primary.is_none());
        assert!(snapshot.secondary.is_none());
    }
}
