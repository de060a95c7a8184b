//! Claude API client for OAuth-based usage fetching.
//!
//! This module provides a client for the Anthropic API to fetch usage data.
//!
//! # API Endpoint
//!
//! ```text
//! GET https://api.anthropic.com/api/oauth/usage
//! Authorization: Bearer <access_token>
//! anthropic-beta: oauth-2025-04-20
//! ```
//!
//! # Response Format
//!
//! ```json
//! {
//!   "five_hour": {"utilization": 25.0, "resets_at": "2025-01-01T12:00:00Z"},
//!   "seven_day": {"utilization": 45.0, "resets_at": "2025-01-05T00:00:00Z"},
//!   "seven_day_sonnet": {"utilization": 30.0, "resets_at": "2025-01-05T00:00:00Z"},
//!   "seven_day_opus": {"utilization": 10.0, "resets_at": "2025-01-05T00:00:00Z"},
//!   "extra_usage": {"is_enabled": true, "used_credits": 500, "monthly_limit": 10000}
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::error::ClaudeError;
use super::oauth::ClaudeOAuthCredentials;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for Claude API.
pub const API_BASE_URL: &str = "https://api.anthropic.com";

/// Usage endpoint.
pub const USAGE_ENDPOINT: &str = "/api/oauth/usage";

/// Beta header value required by the OAuth usage endpoint.
pub const OAUTH_BETA_HEADER: &str = "oauth-2025-04-20";

/// Alternative usage endpoint (claude.ai).
#[allow(dead_code)]
pub const CLAUDE_AI_USAGE_ENDPOINT: &str = "https://claude.ai/api/organizations";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from the usage API.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageApiResponse {
    /// 5-hour usage window.
    pub five_hour: Option<UsageWindow>,
    /// 7-day usage window (all models).
    pub seven_day: Option<UsageWindow>,
    /// 7-day Sonnet usage window.
    pub seven_day_sonnet: Option<UsageWindow>,
    /// 7-day Opus usage window.
    pub seven_day_opus: Option<UsageWindow>,
    /// Extra usage/credits info.
    pub extra_usage: Option<ExtraUsage>,
    /// Account info.
    pub account: Option<AccountInfo>,
}

/// Individual usage window from API.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageWindow {
    /// Utilization percentage (0-100).
    pub utilization: f64,
    /// When this window resets (ISO 8601).
    pub resets_at: Option<String>,
    /// Remaining percentage (alternative field).
    pub remaining: Option<f64>,
    /// Used percentage (alternative field).
    pub used_percent: Option<f64>,
}

impl UsageWindow {
    /// Get the used percentage, handling various field names.
    pub fn get_used_percent(&self) -> f64 {
        // utilization is the "used" percentage
        if self.utilization > 0.0 {
            return self.utilization;
        }
        if let Some(used) = self.used_percent {
            return used;
        }
        if let Some(remaining) = self.remaining {
            return 100.0 - remaining;
        }
        0.0
    }

    /// Parse the reset timestamp.
    pub fn get_resets_at(&self) -> Option<DateTime<Utc>> {
        self.resets_at.as_ref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }
}

/// Extra usage/credits information.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraUsage {
    /// Whether extra usage is enabled.
    pub is_enabled: Option<bool>,
    /// Credits used this month, in cents.
    pub used_credits: Option<f64>,
    /// Monthly credit limit, in cents.
    pub monthly_limit: Option<f64>,
    /// Currency (e.g., "USD").
    pub currency: Option<String>,
}

/// Account information from API.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    /// Account email.
    pub email: Option<String>,
    /// Plan name.
    pub plan: Option<String>,
    /// Organization name.
    pub organization: Option<String>,
}

// ============================================================================
// API Client
// ============================================================================

/// Claude API client for fetching usage data.
#[derive(Debug, Clone)]
pub struct ClaudeApiClient {
    base_url: String,
}

impl Default for ClaudeApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaudeApiClient {
    /// Create a new API client.
    pub fn new() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Fetch usage data using OAuth credentials.
    #[instrument(skip(self, credentials))]
    pub async fn fetch_usage(
        &self,
        credentials: &ClaudeOAuthCredentials,
    ) -> Result<UsageApiResponse, ClaudeError> {
        if credentials.is_expired() {
            return Err(ClaudeError::TokenExpired(
                credentials
                    .expires_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        self.fetch_usage_with_token(&credentials.access_token).await
    }

    /// Fetch usage using the access token directly.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_usage_with_token(
        &self,
        access_token: &str,
    ) -> Result<UsageApiResponse, ClaudeError> {
        let url = format!("{}{}", self.base_url, USAGE_ENDPOINT);

        debug!(url = %url, "Fetching usage from API");

        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("anthropic-beta", OAUTH_BETA_HEADER)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ClaudeError::HttpError(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClaudeError::AuthenticationFailed(
                "OAuth token rejected".to_string(),
            ));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ClaudeError::MissingScope("user:profile".to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "API request failed");
            return Err(ClaudeError::ApiError(format!(
                "API returned status {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClaudeError::HttpError(e.to_string()))?;

        debug!(len = body.len(), "Received API response");

        let usage: UsageApiResponse = serde_json::from_str(&body)
            .map_err(|e| ClaudeError::ParseError(format!("Failed to parse response: {}", e)))?;

        Ok(usage)
    }
}

// ============================================================================
// Conversion to Core Types
// ============================================================================

impl UsageApiResponse {
    /// Convert to a UsageSnapshot.
    pub fn to_snapshot(&self) -> quotawatch_core::UsageSnapshot {
        use quotawatch_core::{FetchSource, LoginMethod, ProviderIdentity, ProviderKind};

        let mut snapshot = quotawatch_core::UsageSnapshot::new(quotawatch_core::ProviderKind::Claude);
        snapshot.fetch_source = FetchSource::OAuth;

        // Primary = 5-hour window
        if let Some(ref window) = self.five_hour {
            snapshot.primary = Some(quotawatch_core::UsageWindow {
                used_percent: window.get_used_percent(),
                window_minutes: Some(300), // 5 hours
                resets_at: window.get_resets_at(),
                label: Some("Session".to_string()),
                ..Default::default()
            });
        }

        // Secondary = 7-day window (all models)
        if let Some(ref window) = self.seven_day {
            snapshot.secondary = Some(quotawatch_core::UsageWindow {
                used_percent: window.get_used_percent(),
                window_minutes: Some(10080), // 7 days
                resets_at: window.get_resets_at(),
                label: Some("Weekly".to_string()),
                ..Default::default()
            });
        }

        // Tertiary = 7-day Sonnet or Opus model-tier window, Sonnet preferred.
        if let Some(ref window) = self.seven_day_sonnet {
            snapshot.tertiary = Some(quotawatch_core::UsageWindow {
                used_percent: window.get_used_percent(),
                window_minutes: Some(10080), // 7 days
                resets_at: window.get_resets_at(),
                label: Some("Sonnet".to_string()),
                ..Default::default()
            });
        } else if let Some(ref window) = self.seven_day_opus {
            snapshot.tertiary = Some(quotawatch_core::UsageWindow {
                used_percent: window.get_used_percent(),
                window_minutes: Some(10080), // 7 days
                resets_at: window.get_resets_at(),
                label: Some("Opus".to_string()),
                ..Default::default()
            });
        }

        // Monthly credit balance, cents -> USD.
        if let Some(ref extra) = self.extra_usage {
            if extra.is_enabled == Some(true) {
                let remaining_credits = match (extra.used_credits, extra.monthly_limit) {
                    (Some(used), Some(limit)) => Some((limit - used).max(0.0) / 100.0),
                    _ => None,
                };
                snapshot.cost = Some(quotawatch_core::ProviderCostInfo {
                    remaining_credits,
                    total_credits: extra.monthly_limit.map(|c| c / 100.0),
                    currency: Some(extra.currency.clone().unwrap_or_else(|| "USD".to_string())),
                    ..Default::default()
                });
            }
        }

        // Account identity
        if let Some(ref account) = self.account {
            let mut identity = ProviderIdentity::new(ProviderKind::Claude);
            identity.account_email = account.email.clone();
            identity.plan_name = account.plan.clone();
            identity.account_organization = account.organization.clone();
            identity.login_method = Some(LoginMethod::OAuth);
            snapshot.identity = Some(identity);
        }

        snapshot
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usage_response() {
        let json = r#"{
            "five_hour": {
                "utilization": 25.5,
                "resets_at": "2025-01-01T12:00:00Z"
            },
            "seven_day": {
                "utilization": 45.0,
                "resets_at": "2025-01-05T00:00:00Z"
            },
            "seven_day_sonnet": {
                "utilization": 30.0,
                "resets_at": "2025-01-05T00:00:00Z"
            },
            "extra_usage": {
                "is_enabled": true,
                "used_credits": 500,
                "monthly_limit": 10000,
                "currency": "USD"
            },
            "account": {
                "email": "user@example.com",
                "plan": "pro",
                "organization": "Acme Inc"
            }
        }"#;

        let response: UsageApiResponse = serde_json::from_str(json).unwrap();

        let five_hour = response.five_hour.as_ref().unwrap();
        assert!((five_hour.utilization - 25.5).abs() < 0.01);
        assert!(five_hour.get_resets_at().is_some());

        let seven_day = response.seven_day.as_ref().unwrap();
        assert!((seven_day.utilization - 45.0).abs() < 0.01);

        let sonnet = response.seven_day_sonnet.as_ref().unwrap();
        assert!((sonnet.utilization - 30.0).abs() < 0.01);

        let extra = response.extra_usage.as_ref().unwrap();
        assert_eq!(extra.is_enabled, Some(true));
        assert!((extra.used_credits.unwrap() - 500.0).abs() < 0.01);

        let account = response.account.as_ref().unwrap();
        assert_eq!(account.email, Some("user@example.com".to_string()));
        assert_eq!(account.plan, Some("pro".to_string()));
    }

    #[test]
    fn test_usage_window_get_used_percent() {
        // Test utilization field
        let window = UsageWindow {
            utilization: 25.0,
            resets_at: None,
            remaining: None,
            used_percent: None,
        };
        assert!((window.get_used_percent() - 25.0).abs() < 0.01);

        // Test remaining field (75% remaining = 25% used)
        let window = UsageWindow {
            utilization: 0.0,
            resets_at: None,
            remaining: Some(75.0),
            used_percent: None,
        };
        assert!((window.get_used_percent() - 25.0).abs() < 0.01);

        // Test used_percent field
        let window = UsageWindow {
            utilization: 0.0,
            resets_at: None,
            remaining: None,
            used_percent: Some(30.0),
        };
        assert!((window.get_used_percent() - 30.0).abs() < 0.01);
    }

    /// End-to-end scenario 1: Claude OAuth happy path.
    #[test]
    fn test_to_snapshot_oauth_happy_path() {
        let json = r#"{
            "five_hour": {"utilization": 42.0, "resets_at": "2026-02-16T20:00:00Z"},
            "seven_day": {"utilization": 12.5, "resets_at": "2026-02-22T00:00:00Z"},
            "seven_day_sonnet": {"utilization": 7.0, "resets_at": "2026-02-22T00:00:00Z"}
        }"#;

        let response: UsageApiResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();

        let primary = snapshot.primary.as_ref().unwrap();
        assert!((primary.used_percent - 42.0).abs() < 0.01);
        assert_eq!(primary.window_minutes, Some(300));
        assert_eq!(primary.label.as_deref(), Some("Session"));

        let secondary = snapshot.secondary.as_ref().unwrap();
        assert!((secondary.used_percent - 12.5).abs() < 0.01);
        assert_eq!(secondary.window_minutes, Some(10080));
        assert_eq!(secondary.label.as_deref(), Some("Weekly"));

        let tertiary = snapshot.tertiary.as_ref().unwrap();
        assert!((tertiary.used_percent - 7.0).abs() < 0.01);
        assert_eq!(tertiary.window_minutes, Some(10080));
        assert_eq!(tertiary.label.as_deref(), Some("Sonnet"));

        assert!(snapshot.cost.is_none());
    }

    #[test]
    fn test_to_snapshot_opus_tertiary_fallback() {
        let json = r#"{
            "five_hour": {"utilization": 1.0, "resets_at": null},
            "seven_day_opus": {"utilization": 10.0, "resets_at": null}
        }"#;
        let response: UsageApiResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();
        assert_eq!(
            snapshot.tertiary.as_ref().unwrap().label.as_deref(),
            Some("Opus")
        );
    }

    #[test]
    fn test_to_snapshot_extra_usage_cents_to_usd() {
        let json = r#"{
            "five_hour": {"utilization": 1.0, "resets_at": null},
            "extra_usage": {"is_enabled": true, "used_credits": 500, "monthly_limit": 10000, "currency": "USD"}
        }"#;
        let response: UsageApiResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();
        let cost = snapshot.cost.as_ref().unwrap();
        assert!((cost.remaining_credits.unwrap() - 95.0).abs() < 0.01);
        assert!((cost.total_credits.unwrap() - 100.0).abs() < 0.01);
        assert_eq!(cost.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_to_snapshot() {
        let response = UsageApiResponse {
            five_hour: Some(UsageWindow {
                utilization: 25.0,
                resets_at: Some("2025-01-01T12:00:00Z".to_string()),
                remaining: None,
                used_percent: None,
            }),
            seven_day: Some(UsageWindow {
                utilization: 45.0,
                resets_at: None,
                remaining: None,
                used_percent: None,
            }),
            seven_day_sonnet: None,
            seven_day_opus: None,
            extra_usage: None,
            account: Some(AccountInfo {
                email: Some("test@example.com".to_string()),
                plan: Some("pro".to_string()),
                organization: None,
            }),
        };

        let snapshot = response.to_snapshot();

        assert!(snapshot.primary.is_some());
        assert!((snapshot.primary.as_ref().unwrap().used_percent - 25.0).abs() < 0.01);

        assert!(snapshot.secondary.is_some());
        assert!((snapshot.secondary.as_ref().unwrap().used_percent - 45.0).abs() < 0.01);

        assert!(snapshot.tertiary.is_none());

        assert!(snapshot.identity.is_some());
        assert_eq!(
            snapshot.identity.as_ref().unwrap().account_email,
            Some("test@example.com".to_string())
        );
    }

    #[test]
    fn test_client_creation() {
        let client = ClaudeApiClient::new();
        assert_eq!(client.base_url, API_BASE_URL);

        let custom = ClaudeApiClient::with_base_url("https://custom.api.com");
        assert_eq!(custom.base_url, "https://custom.api.com");
    }
}
