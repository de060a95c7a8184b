//! Cursor web API client.
//!
//! This module provides HTTP client functionality for the Cursor API,
//! using browser cookies for authentication.

use chrono::{DateTime, Utc};
use quotawatch_core::{LoginMethod, ProviderIdentity, ProviderKind, UsageSnapshot, UsageWindow};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::error::CursorError;

// ============================================================================
// Constants
// ============================================================================

/// Cursor API base URL.
pub const CURSOR_API_BASE: &str = "https://www.cursor.com";

/// Cursor usage API endpoint.
const USAGE_ENDPOINT: &str = "/api/usage-summary";

/// Cursor auth/me endpoint.
const AUTH_ME_ENDPOINT: &str = "/api/auth/me";

/// User agent for API requests.
const USER_AGENT_VALUE: &str = "QuotaWatch/1.0";

/// Session cookie names that indicate a logged-in Cursor session.
const SESSION_COOKIE_NAMES: &[&str] = &[
    "WorkosCursorSessionToken",
    "__Secure-next-auth.session-token",
    "next-auth.session-token",
];

// ============================================================================
// API Response Types
// ============================================================================

/// Response from `GET /api/usage-summary`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorUsageResponse {
    /// Per-plan request usage (e.g. the included-with-plan allowance).
    #[serde(default)]
    pub individual_usage: Option<IndividualUsage>,

    /// Pay-as-you-go usage beyond the plan allowance.
    #[serde(default)]
    pub on_demand: Option<OnDemandUsage>,

    /// Overall percent used, pre-computed by the API. May be expressed as
    /// either a 0-1 fraction or a 0-100 percentage.
    #[serde(default)]
    pub total_percent_used: Option<f64>,

    /// Subscription tier ("free", "pro", "business", ...).
    #[serde(default)]
    pub membership_type: Option<String>,

    /// End of the current billing cycle (reset instant), ISO-8601.
    #[serde(default)]
    pub billing_cycle_end: Option<String>,
}

/// Plan-included usage, nested under `individualUsage`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualUsage {
    #[serde(default)]
    pub plan: Option<PlanUsage>,
}

/// `used`/`limit` pair for the plan allowance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUsage {
    #[serde(default)]
    pub used: Option<f64>,
    #[serde(default)]
    pub limit: Option<f64>,
}

/// `used`/`limit` pair for on-demand (pay-as-you-go) spend, in cents.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDemandUsage {
    #[serde(default)]
    pub used: Option<f64>,
    #[serde(default)]
    pub limit: Option<f64>,
}

impl CursorUsageResponse {
    /// Get the primary usage percentage from the plan allowance, falling
    /// back to the API's own pre-computed `totalPercentUsed` (normalized
    /// from either a 0-1 fraction or a 0-100 percentage).
    pub fn get_primary_percent(&self) -> Option<f64> {
        if let Some(plan) = self.individual_usage.as_ref().and_then(|i| i.plan.as_ref()) {
            if let (Some(used), Some(limit)) = (plan.used, plan.limit) {
                if limit > 0.0 {
                    return Some((used / limit) * 100.0);
                }
            }
        }

        self.total_percent_used.map(|p| if p <= 1.0 { p * 100.0 } else { p })
    }

    /// Get the on-demand spend as a secondary window, labeled "$used / $limit".
    pub fn get_on_demand(&self) -> Option<(f64, String)> {
        let on_demand = self.on_demand.as_ref()?;
        let (used, limit) = (on_demand.used?, on_demand.limit?);

        let percent = if limit > 0.0 { (used / limit) * 100.0 } else { 0.0 };
        let label = format!("${:.2} / ${:.2}", used / 100.0, limit / 100.0);

        Some((percent, label))
    }

    /// Get the billing-cycle reset time.
    pub fn get_reset_time(&self) -> Option<DateTime<Utc>> {
        let end_str = self.billing_cycle_end.as_ref()?;

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(end_str) {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(dt) = chrono::DateTime::parse_from_str(end_str, "%Y-%m-%dT%H:%M:%S%.fZ") {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(date) = chrono::NaiveDate::parse_from_str(end_str, "%Y-%m-%d") {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }

        None
    }

    /// Convert to UsageSnapshot.
    pub fn to_snapshot(&self) -> UsageSnapshot {
        let mut snapshot = UsageSnapshot::new(quotawatch_core::ProviderKind::Cursor);
        snapshot.fetch_source = quotawatch_core::FetchSource::Web;

        // Primary usage window (plan allowance)
        if let Some(percent) = self.get_primary_percent() {
            let mut window = UsageWindow::new(percent);
            window.resets_at = self.get_reset_time();
            snapshot.primary = Some(window);
        }

        // Secondary usage window (on-demand spend)
        if let Some((percent, label)) = self.get_on_demand() {
            let mut window = UsageWindow::new(percent);
            window.label = Some(label);
            snapshot.secondary = Some(window);
        }

        // Identity (plan name only; email/org come from the auth/me response)
        if let Some(ref membership) = self.membership_type {
            let mut identity = ProviderIdentity::new(ProviderKind::Cursor);
            identity.plan_name = Some(membership.clone());
            identity.login_method = Some(LoginMethod::BrowserCookies);
            snapshot.identity = Some(identity);
        }

        snapshot
    }
}

/// Response from Cursor auth/me API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorAuthResponse {
    /// User email.
    #[serde(default)]
    pub email: Option<String>,

    /// User name.
    #[serde(default)]
    pub name: Option<String>,

    /// User ID.
    #[serde(default)]
    pub id: Option<String>,

    /// Subscription plan.
    #[serde(default)]
    pub plan: Option<String>,

    /// Whether user is a subscriber.
    #[serde(default, alias = "is_subscriber")]
    pub subscriber: Option<bool>,
}

// ============================================================================
// Web Client
// ============================================================================

/// Cursor web API client.
#[derive(Debug)]
pub struct CursorWebClient {
    http: reqwest::Client,
}

impl CursorWebClient {
    /// Creates a new Cursor web client.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { http }
    }

    /// Check if a cookie header contains a valid session cookie.
    pub fn has_session_cookie(cookie_header: &str) -> bool {
        SESSION_COOKIE_NAMES
            .iter()
            .any(|name| cookie_header.contains(name))
    }

    /// Fetch usage data from Cursor API.
    #[instrument(skip(self, cookie_header))]
    pub async fn fetch_usage(
        &self,
        cookie_header: &str,
    ) -> Result<CursorUsageResponse, CursorError> {
        debug!("Fetching Cursor usage via web API");

        if cookie_header.is_empty() {
            return Err(CursorError::NoSessionCookie);
        }

        let url = format!("{}{}", CURSOR_API_BASE, USAGE_ENDPOINT);
        let headers = self.build_headers(cookie_header)?;

        let response = self
            .http
            .get(&url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CursorError::AuthenticationFailed(
                "Session expired or invalid".to_string(),
            ));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CursorError::RateLimited(
                "Too many requests".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CursorError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        debug!(len = body.len(), "Got usage response");

        let usage: CursorUsageResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, body = %body, "Failed to parse usage response");
            CursorError::InvalidResponse(format!("JSON parse error: {}", e))
        })?;

        Ok(usage)
    }

    /// Fetch auth/user info from Cursor API.
    #[instrument(skip(self, cookie_header))]
    pub async fn fetch_auth(
        &self,
        cookie_header: &str,
    ) -> Result<CursorAuthResponse, CursorError> {
        debug!("Fetching Cursor auth info via web API");

        let url = format!("{}{}", CURSOR_API_BASE, AUTH_ME_ENDPOINT);
        let headers = self.build_headers(cookie_header)?;

        let response = self
            .http
            .get(&url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CursorError::AuthenticationFailed(
                "Session expired or invalid".to_string(),
            ));
        }

        if !status.is_success() {
            return Err(CursorError::InvalidResponse(format!(
                "HTTP {}",
                status
            )));
        }

        let body = response.text().await?;

        let auth: CursorAuthResponse = serde_json::from_str(&body).map_err(|e| {
            CursorError::InvalidResponse(format!("JSON parse error: {}", e))
        })?;

        Ok(auth)
    }

    /// Fetch usage and identity in parallel, merging the identity response
    /// (email, plan) into the usage snapshot.
    #[instrument(skip(self, cookie_header))]
    pub async fn fetch_snapshot(&self, cookie_header: &str) -> Result<UsageSnapshot, CursorError> {
        let (usage, auth) =
            tokio::join!(self.fetch_usage(cookie_header), self.fetch_auth(cookie_header));

        let usage = usage?;
        let mut snapshot = usage.to_snapshot();

        if let Ok(auth) = auth {
            let identity = snapshot.identity.get_or_insert_with(|| {
                let mut identity = ProviderIdentity::new(ProviderKind::Cursor);
                identity.login_method = Some(LoginMethod::BrowserCookies);
                identity
            });
            identity.account_email = auth.email.or_else(|| identity.account_email.take());
            if identity.plan_name.is_none() {
                identity.plan_name = auth.plan;
            }
        }

        Ok(snapshot)
    }

    /// Build request headers.
    fn build_headers(&self, cookie_header: &str) -> Result<HeaderMap, CursorError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(USER_AGENT_VALUE),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookie_header).map_err(|e| {
                CursorError::HttpError(format!("Invalid cookie header: {}", e))
            })?,
        );

        Ok(headers)
    }
}

impl Default for CursorWebClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CursorWebClient::new();
        assert!(std::mem::size_of_val(&client) > 0);
    }

    #[test]
    fn test_has_session_cookie() {
        assert!(CursorWebClient::has_session_cookie(
            "WorkosCursorSessionToken=abc123"
        ));
        assert!(CursorWebClient::has_session_cookie(
            "__Secure-next-auth.session-token=abc123"
        ));
        assert!(CursorWebClient::has_session_cookie(
            "next-auth.session-token=abc123"
        ));
        assert!(!CursorWebClient::has_session_cookie("random_cookie=here"));
    }

    #[test]
    fn test_parse_usage_summary_response() {
        let json = r#"{
            "individualUsage": {
                "plan": {"used": 150, "limit": 500}
            },
            "onDemand": {"used": 1234, "limit": 5000},
            "totalPercentUsed": 0.3,
            "membershipType": "pro",
            "billingCycleEnd": "2025-02-01"
        }"#;

        let response: CursorUsageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.get_primary_percent(), Some(30.0));
        let (on_demand_percent, label) = response.get_on_demand().unwrap();
        assert!((on_demand_percent - 24.68).abs() < 0.1);
        assert_eq!(label, "$12.34 / $50.00");
        assert_eq!(response.membership_type.as_deref(), Some("pro"));
    }

    #[test]
    fn test_total_percent_used_normalizes_0_to_100_scale() {
        let json = r#"{"totalPercentUsed": 42.0}"#;
        let response: CursorUsageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.get_primary_percent(), Some(42.0));
    }

    #[test]
    fn test_total_percent_used_normalizes_0_to_1_scale() {
        let json = r#"{"totalPercentUsed": 0.42}"#;
        let response: CursorUsageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.get_primary_percent(), Some(42.0));
    }

    #[test]
    fn test_to_snapshot() {
        let json = r#"{
            "individualUsage": {"plan": {"used": 100, "limit": 500}},
            "onDemand": {"used": 0, "limit": 0},
            "membershipType": "pro",
            "billingCycleEnd": "2025-02-01T00:00:00Z"
        }"#;
        let response: CursorUsageResponse = serde_json::from_str(json).unwrap();
        let snapshot = response.to_snapshot();

        assert!(snapshot.primary.is_some());
        let primary = snapshot.primary.unwrap();
        assert_eq!(primary.used_percent, 20.0);
        assert!(primary.resets_at.is_some());

        assert!(snapshot.identity.is_some());
        let identity = snapshot.identity.unwrap();
        assert_eq!(identity.plan_name, Some("pro".to_string()));
    }

    #[test]
    fn test_get_reset_time() {
        let json = r#"{"billingCycleEnd": "2025-02-01T00:00:00Z"}"#;
        let response: CursorUsageResponse = serde_json::from_str(json).unwrap();
        let reset = response.get_reset_time();
        assert!(reset.is_some());
    }
}
