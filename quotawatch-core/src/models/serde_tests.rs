//! Serde serialization/deserialization tests for core types.
//!
//! These tests verify that all core types can be correctly serialized to JSON
//! and deserialized back, preserving all data through the round-trip.

use chrono::{Duration, Utc};

use crate::{
    CostUsageSnapshot, DailyCost, FetchSource, LoginMethod, ModelSubtotal, ProviderCostInfo,
    ProviderIdentity, ProviderKind, ProviderMetadata, RateWindow, UsagePace, UsageSnapshot,
};

// ============================================================================
// ProviderKind Serde Tests
// ============================================================================

#[test]
fn test_provider_kind_serde_roundtrip_all_variants() {
    for kind in ProviderKind::all() {
        let json = serde_json::to_string(kind).unwrap();
        let deserialized: ProviderKind = serde_json::from_str(&json).unwrap();
        assert_eq!(*kind, deserialized, "Round-trip failed for {:?}", kind);
    }
}

#[test]
fn test_provider_kind_deserialize_lowercase() {
    let test_cases = vec![
        (r#""codex""#, ProviderKind::Codex),
        (r#""claude""#, ProviderKind::Claude),
        (r#""cursor""#, ProviderKind::Cursor),
        (r#""gemini""#, ProviderKind::Gemini),
        (r#""copilot""#, ProviderKind::Copilot),
        (r#""antigravity""#, ProviderKind::Antigravity),
    ];

    for (json, expected) in test_cases {
        let result: ProviderKind = serde_json::from_str(json).unwrap();
        assert_eq!(result, expected, "Failed for {}", json);
    }
}

#[test]
fn test_provider_kind_invalid_deserialize() {
    let result: Result<ProviderKind, _> = serde_json::from_str(r#""invalid_provider""#);
    assert!(result.is_err());
}

// ============================================================================
// UsageSnapshot Serde Tests
// ============================================================================

#[test]
fn test_usage_snapshot_empty_roundtrip() {
    let snapshot = UsageSnapshot::new(ProviderKind::Claude);
    let json = serde_json::to_string(&snapshot).unwrap();
    let deserialized: UsageSnapshot = serde_json::from_str(&json).unwrap();

    assert!(deserialized.primary.is_none());
    assert!(deserialized.secondary.is_none());
    assert!(deserialized.tertiary.is_none());
}

#[test]
fn test_usage_snapshot_full_roundtrip() {
    let mut snapshot = UsageSnapshot::new(ProviderKind::Claude);

    snapshot.primary = Some(RateWindow {
        used_percent: 45.5,
        window_minutes: Some(300),
        resets_at: Some(Utc::now() + Duration::hours(2)),
        label: Some("Current session".to_string()),
        ..RateWindow::new(45.5)
    });

    snapshot.secondary = Some(RateWindow::new(20.0));
    snapshot.tertiary = Some(RateWindow::new(75.0));
    snapshot.fetch_source = FetchSource::CLI;
    snapshot.account_id = Some("acct_123".to_string());

    let mut identity = ProviderIdentity::new(ProviderKind::Claude);
    identity.account_email = Some("test@example.com".to_string());
    identity.plan_name = Some("Pro".to_string());
    snapshot.identity = Some(identity);

    let json = serde_json::to_string(&snapshot).unwrap();
    let deserialized: UsageSnapshot = serde_json::from_str(&json).unwrap();

    assert!(deserialized.primary.is_some());
    assert_eq!(deserialized.primary.as_ref().unwrap().used_percent, 45.5);
    assert_eq!(
        deserialized.primary.as_ref().unwrap().window_minutes,
        Some(300)
    );
    assert!(deserialized.secondary.is_some());
    assert!(deserialized.tertiary.is_some());
    assert!(deserialized.identity.is_some());
    assert_eq!(
        deserialized.identity.as_ref().unwrap().account_email,
        Some("test@example.com".to_string())
    );
    assert_eq!(deserialized.account_id, Some("acct_123".to_string()));
}

// ============================================================================
// RateWindow Serde Tests
// ============================================================================

#[test]
fn test_rate_window_boundary_values() {
    let test_cases = vec![0.0_f64, 50.0, 100.0, 0.001, 99.999];

    for percent in test_cases {
        let window = RateWindow::new(percent);
        let json = serde_json::to_string(&window).unwrap();
        let deserialized: RateWindow = serde_json::from_str(&json).unwrap();
        assert!(
            (deserialized.used_percent - percent).abs() < 0.0001,
            "Failed for {}",
            percent
        );
    }
}

#[test]
fn test_rate_window_with_reset_time() {
    let mut window = RateWindow::new(50.0);
    let future_time = Utc::now() + Duration::hours(5);
    window.resets_at = Some(future_time);
    window.label = Some("Current session".to_string());

    let json = serde_json::to_string(&window).unwrap();
    let deserialized: RateWindow = serde_json::from_str(&json).unwrap();

    assert!(deserialized.resets_at.is_some());
    assert_eq!(deserialized.label, Some("Current session".to_string()));
}

// ============================================================================
// ProviderCostInfo Serde Tests
// ============================================================================

#[test]
fn test_provider_cost_info_roundtrip() {
    let mut cost = ProviderCostInfo::new();
    cost.remaining_credits = Some(25.50);
    cost.total_credits = Some(100.0);
    cost.currency = Some("USD".to_string());

    let json = serde_json::to_string(&cost).unwrap();
    let deserialized: ProviderCostInfo = serde_json::from_str(&json).unwrap();

    assert!((deserialized.remaining_credits.unwrap() - 25.50).abs() < 0.001);
    assert_eq!(deserialized.total_credits, Some(100.0));
}

// ============================================================================
// ProviderIdentity Serde Tests
// ============================================================================

#[test]
fn test_provider_identity_full_roundtrip() {
    let mut identity = ProviderIdentity::new(ProviderKind::Codex);
    identity.account_email = Some("user@company.com".to_string());
    identity.account_organization = Some("Acme Corp".to_string());
    identity.plan_name = Some("Enterprise".to_string());
    identity.login_method = Some(LoginMethod::OAuth);

    let json = serde_json::to_string(&identity).unwrap();
    let deserialized: ProviderIdentity = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.provider_id, ProviderKind::Codex);
    assert_eq!(
        deserialized.account_email,
        Some("user@company.com".to_string())
    );
    assert_eq!(
        deserialized.account_organization,
        Some("Acme Corp".to_string())
    );
    assert_eq!(deserialized.login_method, Some(LoginMethod::OAuth));
}

// ============================================================================
// LoginMethod Serde Tests
// ============================================================================

#[test]
fn test_login_method_all_variants() {
    let variants = vec![
        LoginMethod::OAuth,
        LoginMethod::ApiKey,
        LoginMethod::BrowserCookies,
        LoginMethod::CLI,
        LoginMethod::DeviceFlow,
    ];

    for method in variants {
        let json = serde_json::to_string(&method).unwrap();
        let deserialized: LoginMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(method, deserialized);
    }
}

// ============================================================================
// FetchSource Serde Tests
// ============================================================================

#[test]
fn test_fetch_source_all_variants() {
    for source in FetchSource::all() {
        let json = serde_json::to_string(source).unwrap();
        let deserialized: FetchSource = serde_json::from_str(&json).unwrap();
        assert_eq!(*source, deserialized);
    }
}

// ============================================================================
// CostUsageSnapshot Serde Tests
// ============================================================================

#[test]
fn test_cost_usage_snapshot_with_daily_entries() {
    let mut snapshot = CostUsageSnapshot::empty(Utc::now());
    snapshot.today.input_tokens = 5000;
    snapshot.today.cost_usd = 0.15;
    snapshot.last_30_days.input_tokens = 100_000;
    snapshot.last_30_days.cost_usd = 3.50;

    let mut entry = DailyCost::new("2024-01-15");
    entry.input_tokens = 1000;
    entry.output_tokens = 500;
    entry.cost_usd = 0.05;
    snapshot.daily.push(entry);

    let json = serde_json::to_string(&snapshot).unwrap();
    let deserialized: CostUsageSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.today.input_tokens, 5000);
    assert_eq!(deserialized.daily.len(), 1);
    assert_eq!(deserialized.daily[0].date, "2024-01-15");
}

// ============================================================================
// ModelSubtotal Serde Tests
// ============================================================================

#[test]
fn test_model_subtotal_roundtrip() {
    let mut subtotal = ModelSubtotal::new("claude-3-opus-20240229");
    subtotal.cost_usd = 0.75;
    subtotal.input_tokens = 10000;
    subtotal.output_tokens = 5000;

    let json = serde_json::to_string(&subtotal).unwrap();
    let deserialized: ModelSubtotal = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.model, "claude-3-opus-20240229");
    assert_eq!(deserialized.input_tokens + deserialized.output_tokens, 15000);
}

// ============================================================================
// Complex Nested Structures
// ============================================================================

#[test]
fn test_full_provider_metadata_roundtrip() {
    let metadata = ProviderMetadata::for_provider(ProviderKind::Claude);

    let json = serde_json::to_string(&metadata).unwrap();
    let deserialized: ProviderMetadata = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.id, ProviderKind::Claude);
    assert_eq!(deserialized.display_name, "Claude");
}

// ============================================================================
// UsagePace Serde Tests
// ============================================================================

#[test]
fn test_usage_pace_roundtrip() {
    let now = Utc::now();
    let pace = UsagePace::calculate(50.0, now + Duration::minutes(150), 300, now).unwrap();

    let json = serde_json::to_string(&pace).unwrap();
    let deserialized: UsagePace = serde_json::from_str(&json).unwrap();

    assert!((deserialized.expected_used_percent - pace.expected_used_percent).abs() < 0.001);
}

// ============================================================================
// Backward Compatibility Tests
// ============================================================================

#[test]
fn test_deserialize_minimal_usage_snapshot() {
    let json = r#"{
        "provider_id": "claude",
        "updated_at": "2024-01-15T10:00:00Z"
    }"#;

    let snapshot: UsageSnapshot = serde_json::from_str(json).unwrap();
    assert!(snapshot.primary.is_none());
    assert!(snapshot.identity.is_none());
}

#[test]
fn test_deserialize_with_unknown_fields() {
    let json = r#"{
        "used_percent": 50.0,
        "unknown_field": "should be ignored"
    }"#;

    let result: Result<RateWindow, _> = serde_json::from_str(json);
    assert!(result.is_err(), "missing required fields should still fail");

    let json_full = r#"{
        "used_percent": 50.0,
        "used_tokens": null,
        "limit_tokens": null,
        "used_messages": null,
        "limit_messages": null,
        "window_minutes": null,
        "resets_at": null,
        "label": null,
        "unknown_field": "should be ignored"
    }"#;
    let result: Result<RateWindow, _> = serde_json::from_str(json_full);
    assert!(result.is_ok());
}
