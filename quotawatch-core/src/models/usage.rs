//! Usage-related types.
//!
//! This module contains types related to usage tracking:
//! - [`UsageSnapshot`] - main container with primary/secondary/tertiary windows
//! - [`RateWindow`] - an individual rate-limit window
//! - [`ProviderCostInfo`] - credit/cost info reported directly by a provider
//! - [`UsagePace`] - derived consumption pace relative to a reset window

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderKind;
use super::status::FetchSource;
use super::ProviderIdentity;
use crate::error::CoreError;

// ============================================================================
// Usage Snapshot
// ============================================================================

/// A snapshot of usage data with primary, secondary, and tertiary windows.
///
/// - **Primary** = the tightest/shortest rate window (e.g. Claude's 5-hour
///   session window, Codex's primary rate-limit window).
/// - **Secondary** = the next window out (weekly/monthly).
/// - **Tertiary** = a provider-specific extra window (e.g. Claude's
///   Opus-only weekly allowance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// The provider this snapshot is for.
    pub provider_id: ProviderKind,
    /// Account identifier, when the provider distinguishes accounts.
    pub account_id: Option<String>,
    /// Primary usage window.
    pub primary: Option<RateWindow>,
    /// Secondary usage window.
    pub secondary: Option<RateWindow>,
    /// Tertiary usage window.
    pub tertiary: Option<RateWindow>,
    /// Cost/credit info, if this provider reports it directly.
    pub cost: Option<ProviderCostInfo>,
    /// When this snapshot was last updated. Monotonic per provider+account.
    pub updated_at: DateTime<Utc>,
    /// Account identity for this provider.
    pub identity: Option<ProviderIdentity>,
    /// Free-form provider-specific metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// How this data was fetched.
    #[serde(default)]
    pub fetch_source: FetchSource,
}

impl UsageSnapshot {
    /// Creates a new empty usage snapshot for the given provider.
    pub fn new(provider_id: ProviderKind) -> Self {
        Self {
            provider_id,
            account_id: None,
            primary: None,
            secondary: None,
            tertiary: None,
            cost: None,
            updated_at: Utc::now(),
            identity: None,
            metadata: HashMap::new(),
            fetch_source: FetchSource::default(),
        }
    }

    /// Returns true if this snapshot is stale (older than threshold).
    pub fn is_stale(&self, threshold: Duration) -> bool {
        Utc::now() - self.updated_at > threshold
    }

    /// Returns the highest `used_percent` across all present windows.
    pub fn highest_usage_percent(&self) -> f64 {
        [&self.primary, &self.secondary, &self.tertiary]
            .into_iter()
            .filter_map(|w| w.as_ref().map(|w| w.used_percent))
            .fold(0.0_f64, f64::max)
    }

    /// True once the highest window has reached depletion (>= 99%).
    pub fn is_depleted(&self) -> bool {
        self.highest_usage_percent() >= 99.0
    }

    /// True once the highest window is approaching its limit (>= 80%).
    pub fn is_approaching(&self) -> bool {
        self.highest_usage_percent() >= 80.0
    }

    /// Returns true if any window data is present.
    pub fn has_data(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some() || self.tertiary.is_some()
    }

    /// Validates the snapshot data.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` if any usage window contains
    /// invalid percentage values or violates the used <= limit invariant.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, window) in [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("tertiary", &self.tertiary),
        ] {
            if let Some(w) = window {
                w.validate()
                    .map_err(|e| CoreError::InvalidData(format!("{name} window: {e}")))?;
            }
        }
        Ok(())
    }

    /// Clamps window values to valid ranges instead of erroring.
    pub fn sanitize(&mut self) {
        for window in [&mut self.primary, &mut self.secondary, &mut self.tertiary] {
            if let Some(w) = window {
                w.sanitize();
            }
        }
    }
}

// ============================================================================
// Rate Window
// ============================================================================

/// Alias kept for call sites that speak of a "usage window" rather than a
/// "rate window" — the two terms refer to the same type.
pub type UsageWindow = RateWindow;

/// A single rate-limit window (session, weekly, tier-specific, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateWindow {
    /// Percentage of quota used, clamped to [0, 100].
    pub used_percent: f64,
    /// Tokens consumed in this window, if the provider reports them.
    pub used_tokens: Option<u64>,
    /// Token limit for this window, if known.
    pub limit_tokens: Option<u64>,
    /// Messages sent in this window, if the provider reports them.
    pub used_messages: Option<u64>,
    /// Message limit for this window, if known.
    pub limit_messages: Option<u64>,
    /// Window duration in minutes (300 = 5 hours, 10080 = 1 week).
    pub window_minutes: Option<u32>,
    /// When this window resets.
    pub resets_at: Option<DateTime<Utc>>,
    /// Human-readable label (e.g. "Current session", "Opus weekly").
    pub label: Option<String>,
}

impl RateWindow {
    /// Creates a new rate window with the given percentage, clamped to [0, 100].
    pub fn new(used_percent: f64) -> Self {
        Self {
            used_percent: clamp_percent(used_percent),
            used_tokens: None,
            limit_tokens: None,
            used_messages: None,
            limit_messages: None,
            window_minutes: None,
            resets_at: None,
            label: None,
        }
    }

    /// Returns the remaining percentage (100 - used).
    pub fn remaining_percent(&self) -> f64 {
        (100.0 - self.used_percent).max(0.0)
    }

    /// Returns true if usage is over the limit.
    pub fn is_over_limit(&self) -> bool {
        self.used_percent >= 100.0
    }

    /// Returns the window duration as a chrono Duration.
    pub fn window_duration(&self) -> Option<Duration> {
        self.window_minutes.map(|m| Duration::minutes(i64::from(m)))
    }

    /// Returns time until reset, if known.
    pub fn time_until_reset(&self) -> Option<Duration> {
        self.resets_at.map(|reset| reset - Utc::now())
    }

    /// Validates the window data.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` if `used_percent` is out of range
    /// or not finite, or if `used_tokens`/`used_messages` exceed their
    /// declared limits.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.used_percent.is_finite() {
            return Err(CoreError::InvalidData(
                "used_percent is not a finite number".to_string(),
            ));
        }
        if self.used_percent < 0.0 || self.used_percent > 100.0 {
            return Err(CoreError::InvalidData(format!(
                "used_percent {} out of valid range [0, 100]",
                self.used_percent
            )));
        }
        if let (Some(used), Some(limit)) = (self.used_tokens, self.limit_tokens) {
            if used > limit {
                return Err(CoreError::InvalidData(format!(
                    "used_tokens {used} exceeds limit_tokens {limit}"
                )));
            }
        }
        if let (Some(used), Some(limit)) = (self.used_messages, self.limit_messages) {
            if used > limit {
                return Err(CoreError::InvalidData(format!(
                    "used_messages {used} exceeds limit_messages {limit}"
                )));
            }
        }
        Ok(())
    }

    /// Clamps `used_percent` into range and replaces non-finite values with 0.
    pub fn sanitize(&mut self) {
        if !self.used_percent.is_finite() {
            self.used_percent = 0.0;
        }
        self.used_percent = clamp_percent(self.used_percent);
    }
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new(0.0)
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

// ============================================================================
// Provider Cost Info
// ============================================================================

/// Cost/credit information reported directly by a provider (not derived
/// from local log scanning - see `quotawatch_providers::cost` for that).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCostInfo {
    /// Cost accrued today, in `currency` units.
    pub daily_cost: Option<f64>,
    /// Cost accrued this billing month, in `currency` units.
    pub monthly_cost: Option<f64>,
    /// Remaining credits, if the provider uses a credit system.
    pub remaining_credits: Option<f64>,
    /// Total credits for the current period.
    pub total_credits: Option<f64>,
    /// ISO 4217 currency code (e.g. "USD").
    pub currency: Option<String>,
    /// Human-readable period label (e.g. "This month").
    pub period_label: Option<String>,
}

impl ProviderCostInfo {
    /// Creates an empty cost info record.
    pub fn new() -> Self {
        Self {
            daily_cost: None,
            monthly_cost: None,
            remaining_credits: None,
            total_credits: None,
            currency: None,
            period_label: None,
        }
    }

    /// Returns `true` if `remaining_credits <= total_credits` whenever both
    /// are present.
    pub fn is_valid(&self) -> bool {
        match (self.remaining_credits, self.total_credits) {
            (Some(remaining), Some(total)) => remaining <= total && remaining >= 0.0,
            _ => true,
        }
    }
}

impl Default for ProviderCostInfo {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Usage Pace
// ============================================================================

/// How a rate window's consumption compares to a uniform pace toward reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceStage {
    /// Delta magnitude < 5 percentage points.
    OnTrack,
    /// Ahead of pace by 5-10 points.
    SlightlyAhead,
    /// Ahead of pace by 10-20 points.
    Ahead,
    /// Ahead of pace by 20+ points.
    FarAhead,
    /// Behind pace by 5-10 points.
    SlightlyBehind,
    /// Behind pace by 10-20 points.
    Behind,
    /// Behind pace by 20+ points.
    FarBehind,
}

/// Derived consumption pace for a single rate window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsagePace {
    /// The percentage that would be used if consumption were perfectly
    /// uniform over the elapsed portion of the window.
    pub expected_used_percent: f64,
    /// `used_percent - expected_used_percent`.
    pub delta_percent: f64,
    /// Qualitative bucket for `delta_percent`.
    pub stage: PaceStage,
    /// Estimated seconds until the window is fully depleted at the current
    /// rate, if usage is non-zero and non-complete.
    pub eta_seconds: Option<f64>,
    /// Whether the window is expected to last until its reset at the
    /// current rate.
    pub will_last_to_reset: bool,
}

impl UsagePace {
    /// Computes the pace for a window given its current usage percentage,
    /// reset time, window length, and the current time.
    ///
    /// Returns `None` if `resets_at` is not in the future relative to `now`,
    /// or if no time has elapsed in the window yet.
    pub fn calculate(
        used_percent: f64,
        resets_at: DateTime<Utc>,
        window_minutes: u32,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if resets_at <= now {
            return None;
        }
        let window_seconds = f64::from(window_minutes) * 60.0;
        if window_seconds <= 0.0 {
            return None;
        }
        let seconds_to_reset = (resets_at - now).num_milliseconds() as f64 / 1000.0;
        let elapsed_seconds = window_seconds - seconds_to_reset;
        if elapsed_seconds <= 0.0 {
            return None;
        }

        let expected_used_percent = (elapsed_seconds / window_seconds) * 100.0;
        let delta_percent = used_percent - expected_used_percent;
        let stage = Self::stage_for_delta(delta_percent);

        let (eta_seconds, will_last_to_reset) = if used_percent >= 100.0 {
            (Some(0.0), false)
        } else if used_percent <= 0.0 {
            (None, true)
        } else {
            let rate_per_second = used_percent / elapsed_seconds;
            let remaining_percent = 100.0 - used_percent;
            let seconds_to_deplete = remaining_percent / rate_per_second;
            (
                Some(seconds_to_deplete),
                seconds_to_deplete >= seconds_to_reset,
            )
        };

        Some(Self {
            expected_used_percent,
            delta_percent,
            stage,
            eta_seconds,
            will_last_to_reset,
        })
    }

    fn stage_for_delta(delta: f64) -> PaceStage {
        if delta >= 20.0 {
            PaceStage::FarAhead
        } else if delta >= 10.0 {
            PaceStage::Ahead
        } else if delta >= 5.0 {
            PaceStage::SlightlyAhead
        } else if delta <= -20.0 {
            PaceStage::FarBehind
        } else if delta <= -10.0 {
            PaceStage::Behind
        } else if delta <= -5.0 {
            PaceStage::SlightlyBehind
        } else {
            PaceStage::OnTrack
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
    fn test_rate_window_remaining() {
        let window = RateWindow::new(75.0);
        assert_eq!(window.remaining_percent(), 25.0);
        assert!(!window.is_over_limit());
    }

    #[test]
    fn test_rate_window_construction_clamps() {
        assert_eq!(RateWindow::new(150.0).used_percent, 100.0);
        assert_eq!(RateWindow::new(-10.0).used_percent, 0.0);
        assert_eq!(RateWindow::new(f64::NAN).used_percent, 0.0);
    }

    #[test]
    fn test_usage_snapshot_highest_usage_percent() {
        let mut snapshot = UsageSnapshot::new(ProviderKind::Claude);
        snapshot.primary = Some(RateWindow::new(50.0));
        snapshot.secondary = Some(RateWindow::new(85.0));
        snapshot.tertiary = Some(RateWindow::new(30.0));

        assert_eq!(snapshot.highest_usage_percent(), 85.0);
        assert!(snapshot.is_approaching());
        assert!(!snapshot.is_depleted());
    }

    #[test]
    fn test_usage_snapshot_validate_token_invariant() {
        let mut snapshot = UsageSnapshot::new(ProviderKind::Codex);
        let mut window = RateWindow::new(10.0);
        window.used_tokens = Some(200);
        window.limit_tokens = Some(100);
        snapshot.primary = Some(window);
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_usage_snapshot_sanitize() {
        let mut snapshot = UsageSnapshot::new(ProviderKind::Claude);
        snapshot.primary = Some(RateWindow {
            used_percent: 150.0,
            ..RateWindow::new(0.0)
        });
        snapshot.sanitize();
        assert_eq!(snapshot.primary.unwrap().used_percent, 100.0);
    }

    #[test]
    fn test_provider_cost_info_invariant() {
        let mut cost = ProviderCostInfo::new();
        cost.remaining_credits = Some(10.0);
        cost.total_credits = Some(5.0);
        assert!(!cost.is_valid());

        cost.total_credits = Some(20.0);
        assert!(cost.is_valid());
    }

    // UsagePace::calculate tests -- see spec scenario: 50% used, 2.5h into a
    // 5h (300 min) window should read as on-track (expected == 50%).
    #[test]
    fn test_usage_pace_on_track_boundary() {
        let now = Utc::now();
        let resets_at = now + Duration::minutes(150);
        let pace = UsagePace::calculate(50.0, resets_at, 300, now).unwrap();
        assert!((pace.expected_used_percent - 50.0).abs() < 0.01);
        assert!((pace.delta_percent - 0.0).abs() < 0.01);
        assert_eq!(pace.stage, PaceStage::OnTrack);
    }

    #[test]
    fn test_usage_pace_far_ahead() {
        let now = Utc::now();
        let resets_at = now + Duration::minutes(270);
        // 10% elapsed, 50% used => delta ~40
        let pace = UsagePace::calculate(50.0, resets_at, 300, now).unwrap();
        assert_eq!(pace.stage, PaceStage::FarAhead);
    }

    #[test]
    fn test_usage_pace_none_when_already_reset() {
        let now = Utc::now();
        assert!(UsagePace::calculate(50.0, now - Duration::minutes(1), 300, now).is_none());
    }

    #[test]
    fn test_usage_pace_depleted_now() {
        let now = Utc::now();
        let resets_at = now + Duration::minutes(60);
        let pace = UsagePace::calculate(100.0, resets_at, 300, now).unwrap();
        assert_eq!(pace.eta_seconds, Some(0.0));
        assert!(!pace.will_last_to_reset);
    }

    #[test]
    fn test_usage_pace_monotone_in_used_percent() {
        let now = Utc::now();
        let resets_at = now + Duration::minutes(150);
        let low = UsagePace::calculate(10.0, resets_at, 300, now).unwrap();
        let high = UsagePace::calculate(90.0, resets_at, 300, now).unwrap();
        assert!(high.delta_percent > low.delta_percent);
    }
}
