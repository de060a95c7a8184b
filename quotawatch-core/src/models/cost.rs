//! Token cost tracking types, shared by the local JSONL scanners and the
//! history store so both sides agree on one `DailyCost` shape.
//!
//! - [`DailyCost`] - per-day token/cost breakdown, the canonical unit
//! - [`CostUsageSnapshot`] - today/7-day/30-day rollups plus the ordered list
//! - [`ModelSubtotal`] - per-model cost breakdown within a day

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Daily Cost
// ============================================================================

/// Token usage and cost for a single calendar day (local timezone),
/// identified by a `YYYY-MM-DD` key.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DailyCost {
    /// Day key in `YYYY-MM-DD` format (local calendar date).
    pub date: String,
    /// Input tokens.
    pub input_tokens: u64,
    /// Output tokens.
    pub output_tokens: u64,
    /// Cache-read tokens.
    pub cache_read_tokens: u64,
    /// Cache-write (cache creation) tokens.
    pub cache_write_tokens: u64,
    /// Reasoning tokens (Codex only).
    pub reasoning_tokens: u64,
    /// Total cost in USD: sum of `price_per_class * tokens_of_class`.
    pub cost_usd: f64,
    /// Optional per-model cost subtotals for this day.
    #[serde(default)]
    pub model_subtotals: Vec<ModelSubtotal>,
}

impl DailyCost {
    /// Creates an empty entry for the given day key.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    /// Total tokens across all classes.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens
            + self.output_tokens
            + self.cache_read_tokens
            + self.cache_write_tokens
            + self.reasoning_tokens
    }
}

/// Per-model cost subtotal within a single day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSubtotal {
    /// Model identifier as it appears in the provider's logs.
    pub model: String,
    /// Input tokens attributed to this model.
    pub input_tokens: u64,
    /// Output tokens attributed to this model.
    pub output_tokens: u64,
    /// Cost in USD attributed to this model.
    pub cost_usd: f64,
}

impl ModelSubtotal {
    /// Creates a new subtotal for the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
        }
    }
}

// ============================================================================
// Cost Usage Snapshot
// ============================================================================

/// Token cost usage snapshot produced by a local log scanner (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostUsageSnapshot {
    /// Today's rollup.
    pub today: DailyCost,
    /// Rolling 7-day rollup (today inclusive).
    pub last_7_days: DailyCost,
    /// Rolling 30-day rollup (today inclusive).
    pub last_30_days: DailyCost,
    /// Ordered per-day entries (most recent first), bounded to 30 days.
    pub daily: Vec<DailyCost>,
    /// When this snapshot was produced.
    pub scanned_at: DateTime<Utc>,
}

impl CostUsageSnapshot {
    /// Creates an empty snapshot stamped with the given scan time.
    pub fn empty(scanned_at: DateTime<Utc>) -> Self {
        Self {
            today: DailyCost::default(),
            last_7_days: DailyCost::default(),
            last_30_days: DailyCost::default(),
            daily: Vec::new(),
            scanned_at,
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
    fn test_daily_cost_total_tokens() {
        let mut entry = DailyCost::new("2024-01-15");
        entry.input_tokens = 1000;
        entry.output_tokens = 500;
        entry.cache_read_tokens = 200;
        entry.reasoning_tokens = 50;

        assert_eq!(entry.total_tokens(), 1750);
    }

    #[test]
    fn test_cost_snapshot_empty_defaults() {
        let snapshot = CostUsageSnapshot::empty(Utc::now());
        assert_eq!(snapshot.today.total_tokens(), 0);
        assert!(snapshot.daily.is_empty());
    }

    #[test]
    fn test_model_subtotal_new() {
        let subtotal = ModelSubtotal::new("claude-3-opus");
        assert_eq!(subtotal.model, "claude-3-opus");
        assert_eq!(subtotal.cost_usd, 0.0);
    }
}
