//! Integration tests for core snapshot types.

use quotawatch_core::{ProviderKind, RateWindow, UsageSnapshot};

#[test]
fn test_snapshot_serialization_roundtrip() {
    let snapshot = UsageSnapshot::new(ProviderKind::Claude);
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: UsageSnapshot = serde_json::from_str(&json).unwrap();
    assert!(!parsed.has_data());
}

#[test]
fn test_rate_window_validation() {
    let mut window = RateWindow::new(50.0);
    assert!(window.validate().is_ok());

    window.used_percent = -10.0;
    assert!(window.validate().is_err());
}
