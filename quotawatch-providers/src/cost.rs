//! Local JSONL cost scanner (C5).
//!
//! Walks a provider's on-disk session logs and aggregates token usage and
//! estimated cost into a [`CostUsageSnapshot`]. Only Claude and Codex emit
//! the JSONL logs this module depends on; Cursor, Gemini, Copilot, and
//! Antigravity have no local log directory and are out of scope here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use quotawatch_core::{CostUsageSnapshot, DailyCost, ModelSubtotal};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Minimum interval between rescans of the same provider's logs.
const MIN_RESCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Error type for the cost scanner.
#[derive(Debug, Error)]
pub enum CostScanError {
    /// No configured log root exists on disk.
    #[error("no log directory found")]
    NoLogDirectory,
    /// Failed to read a log directory's contents.
    #[error("failed to read log directory {}: {source}", path.display())]
    ReadDir {
        /// Directory that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Day-key bounds
// ============================================================================

/// The three rolling day-key bounds the scanner aggregates into, all in the
/// local time zone.
struct DayBounds {
    today: NaiveDate,
    week_start: NaiveDate,
    month_start: NaiveDate,
}

impl DayBounds {
    fn today() -> Self {
        let today = Local::now().date_naive();
        Self {
            today,
            week_start: today - chrono::Duration::days(6),
            month_start: today - chrono::Duration::days(29),
        }
    }
}

/// Converts an ISO-8601 timestamp (with or without fractional seconds) into
/// a local calendar day key. Returns `None` if the timestamp cannot be
/// parsed.
fn local_day_key(timestamp: &str) -> Option<NaiveDate> {
    let dt = DateTime::parse_from_rfc3339(timestamp).ok()?;
    Some(Local.from_utc_datetime(&dt.naive_utc()).date_naive())
}

// ============================================================================
// File enumeration
// ============================================================================

/// Recursively enumerates `.jsonl` files under `root`, skipping hidden
/// entries (dotfiles/dotdirs) and any path that is itself a descendant of a
/// `node_modules`/`.git`-style package directory. Project log trees are
/// shallow in practice, but the walk is recursive to be robust to nesting.
fn enumerate_jsonl_files(root: &Path) -> Result<Vec<PathBuf>, CostScanError> {
    let mut out = Vec::new();
    walk(root, &mut out)?;
    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), CostScanError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CostScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || is_package_descendant(name) {
            continue;
        }

        if path.is_dir() {
            walk(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
            out.push(path);
        }
    }

    Ok(())
}

fn is_package_descendant(name: &str) -> bool {
    matches!(name, "node_modules" | "target" | "__pycache__" | ".git")
}

// ============================================================================
// Claude scanning
// ============================================================================

const CLAUDE_MARKER: &str = "usage";

#[derive(Debug, Deserialize)]
struct ClaudeLine {
    timestamp: Option<String>,
    #[serde(rename = "requestId")]
    request_id: Option<String>,
    message: Option<ClaudeMessage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeMessage {
    id: Option<String>,
    model: Option<String>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: u64,
}

fn scan_claude_file(path: &Path, bounds: &DayBounds, days: &mut HashMap<NaiveDate, DailyAccumulator>) {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read claude log file");
            return;
        }
    };

    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for line in content.lines() {
        if line.trim().is_empty() || !line.contains(CLAUDE_MARKER) {
            continue;
        }

        let Ok(entry) = serde_json::from_str::<ClaudeLine>(line) else {
            continue;
        };

        let Some(timestamp) = entry.timestamp.as_deref() else {
            continue;
        };
        let Some(day) = local_day_key(timestamp) else {
            continue;
        };
        if day < bounds.month_start || day > bounds.today {
            continue;
        }

        let Some(message) = &entry.message else {
            continue;
        };

        if let (Some(id), Some(request_id)) = (&message.id, &entry.request_id) {
            let key = format!("{id}:{request_id}");
            if !seen.insert(key) {
                continue;
            }
        }

        let usage = message.usage.as_ref().cloned_or_default();
        if usage.input_tokens == 0 && usage.output_tokens == 0 {
            continue;
        }

        let model = message.model.clone().unwrap_or_else(|| "unknown".to_string());
        let acc = days.entry(day).or_default();
        acc.add_claude(&model, &usage);
    }
}

trait ClaudeUsageExt {
    fn cloned_or_default(&self) -> ClaudeUsage;
}

impl ClaudeUsageExt for Option<&ClaudeUsage> {
    fn cloned_or_default(&self) -> ClaudeUsage {
        match self {
            Some(u) => ClaudeUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                cache_read_input_tokens: u.cache_read_input_tokens,
                cache_creation_input_tokens: u.cache_creation_input_tokens,
            },
            None => ClaudeUsage::default(),
        }
    }
}

// ============================================================================
// Codex scanning
// ============================================================================

const CODEX_MARKER: &str = "token_count";

#[derive(Debug, Deserialize)]
struct CodexLine {
    timestamp: Option<String>,
    payload: Option<CodexPayload>,
}

#[derive(Debug, Deserialize)]
struct CodexPayload {
    info: Option<CodexInfo>,
}

#[derive(Debug, Deserialize)]
struct CodexInfo {
    total_token_usage: Option<CodexTokenUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CodexTokenUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    cached_input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    reasoning_output_tokens: u64,
}

/// Scans one Codex session file.
///
/// Codex records cumulative per-session totals, so within a file only the
/// last distinct `(input, output)` pair counts toward that file's
/// contribution to the day. Multiple files landing on the same day each
/// contribute their own final distinct value, and those are summed.
fn scan_codex_file(path: &Path, bounds: &DayBounds, days: &mut HashMap<NaiveDate, DailyAccumulator>) {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read codex log file");
            return;
        }
    };

    let mut last_pair: Option<(u64, u64)> = None;
    let mut last_day: Option<NaiveDate> = None;
    let mut last_usage: Option<CodexTokenUsage> = None;

    for line in content.lines() {
        if line.trim().is_empty() || !line.contains(CODEX_MARKER) {
            continue;
        }

        let Ok(entry) = serde_json::from_str::<CodexLine>(line) else {
            continue;
        };

        let Some(timestamp) = entry.timestamp.as_deref() else {
            continue;
        };
        let Some(day) = local_day_key(timestamp) else {
            continue;
        };
        if day < bounds.month_start || day > bounds.today {
            continue;
        }

        let Some(usage) = entry
            .payload
            .as_ref()
            .and_then(|p| p.info.as_ref())
            .and_then(|i| i.total_token_usage.clone())
        else {
            continue;
        };

        let pair = (usage.input_tokens, usage.output_tokens);
        if last_pair == Some(pair) {
            continue;
        }
        last_pair = Some(pair);
        last_day = Some(day);
        last_usage = Some(usage);
    }

    if let (Some(day), Some(usage)) = (last_day, last_usage) {
        let acc = days.entry(day).or_default();
        acc.add_codex(&usage);
    }
}

// ============================================================================
// Aggregation
// ============================================================================

#[derive(Default)]
struct DailyAccumulator {
    input_tokens: u64,
    output_tokens: u64,
    cache_read_tokens: u64,
    cache_write_tokens: u64,
    reasoning_tokens: u64,
    per_model: HashMap<String, ModelSubtotal>,
}

impl DailyAccumulator {
    fn add_claude(&mut self, model: &str, usage: &ClaudeUsage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_read_tokens += usage.cache_read_input_tokens;
        self.cache_write_tokens += usage.cache_creation_input_tokens;

        let cost = claude_price(model, usage);
        let subtotal = self
            .per_model
            .entry(model.to_string())
            .or_insert_with(|| ModelSubtotal::new(model));
        subtotal.input_tokens += usage.input_tokens;
        subtotal.output_tokens += usage.output_tokens;
        subtotal.cost_usd += cost;
    }

    fn add_codex(&mut self, usage: &CodexTokenUsage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
        self.cache_read_tokens += usage.cached_input_tokens;
        self.reasoning_tokens += usage.reasoning_output_tokens;

        let cost = codex_price(usage);
        let subtotal = self
            .per_model
            .entry(CODEX_MODEL.to_string())
            .or_insert_with(|| ModelSubtotal::new(CODEX_MODEL));
        subtotal.input_tokens += usage.input_tokens;
        subtotal.output_tokens += usage.output_tokens;
        subtotal.cost_usd += cost;
    }

    fn into_daily_cost(self, date: String) -> DailyCost {
        let mut model_subtotals: Vec<ModelSubtotal> = self.per_model.into_values().collect();
        model_subtotals.sort_by(|a, b| a.model.cmp(&b.model));
        let cost_usd = model_subtotals.iter().map(|m| m.cost_usd).sum();

        DailyCost {
            date,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cache_read_tokens: self.cache_read_tokens,
            cache_write_tokens: self.cache_write_tokens,
            reasoning_tokens: self.reasoning_tokens,
            cost_usd,
            model_subtotals,
        }
    }
}

// ============================================================================
// Pricing
// ============================================================================

/// Per-million-token USD pricing for one model tier.
struct ModelPricing {
    input: f64,
    output: f64,
    cache_read: f64,
    cache_write: f64,
}

impl ModelPricing {
    /// Derives cache pricing from input price when not tabulated: cache-read
    /// at ~10% of input, cache-write at ~125%.
    const fn new(input: f64, output: f64) -> Self {
        Self {
            input,
            output,
            cache_read: input * 0.1,
            cache_write: input * 1.25,
        }
    }
}

static CLAUDE_OPUS: ModelPricing = ModelPricing::new(15.0, 75.0);
static CLAUDE_SONNET: ModelPricing = ModelPricing::new(3.0, 15.0);
static CLAUDE_HAIKU: ModelPricing = ModelPricing::new(0.8, 4.0);

const CODEX_MODEL: &str = "gpt-5-codex";
static CODEX_PRICING: ModelPricing = ModelPricing::new(1.25, 10.0);
const CODEX_CACHED_INPUT_PER_MILLION: f64 = 0.125;
const CODEX_REASONING_OUTPUT_PER_MILLION: f64 = 10.0;

fn claude_tier(model: &str) -> &'static ModelPricing {
    let lower = model.to_lowercase();
    if lower.contains("opus") {
        &CLAUDE_OPUS
    } else if lower.contains("haiku") {
        &CLAUDE_HAIKU
    } else {
        // Sonnet-class default, including unrecognized model names.
        &CLAUDE_SONNET
    }
}

fn claude_price(model: &str, usage: &ClaudeUsage) -> f64 {
    let tier = claude_tier(model);
    per_million(usage.input_tokens, tier.input)
        + per_million(usage.output_tokens, tier.output)
        + per_million(usage.cache_read_input_tokens, tier.cache_read)
        + per_million(usage.cache_creation_input_tokens, tier.cache_write)
}

fn codex_price(usage: &CodexTokenUsage) -> f64 {
    let billable_input = usage.input_tokens.saturating_sub(usage.cached_input_tokens);
    per_million(billable_input, CODEX_PRICING.input)
        + per_million(usage.cached_input_tokens, CODEX_CACHED_INPUT_PER_MILLION)
        + per_million(usage.output_tokens, CODEX_PRICING.output)
        + per_million(usage.reasoning_output_tokens, CODEX_REASONING_OUTPUT_PER_MILLION)
}

fn per_million(tokens: u64, price_per_million: f64) -> f64 {
    (tokens as f64 / 1_000_000.0) * price_per_million
}

// ============================================================================
// Scanner
// ============================================================================

/// The kind of JSONL logs a [`CostScanner`] knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostLogFormat {
    /// Claude's message/request-keyed usage logs.
    Claude,
    /// Codex's cumulative `token_count` session logs.
    Codex,
}

/// Scans a provider's local JSONL logs and produces a [`CostUsageSnapshot`],
/// caching the result for [`MIN_RESCAN_INTERVAL`] unless force-refreshed.
pub struct CostScanner {
    format: CostLogFormat,
    roots: Vec<PathBuf>,
    cache: Mutex<Option<(Instant, CostUsageSnapshot)>>,
}

impl CostScanner {
    /// Creates a scanner over the given log roots.
    pub fn new(format: CostLogFormat, roots: Vec<PathBuf>) -> Self {
        Self {
            format,
            roots,
            cache: Mutex::new(None),
        }
    }

    /// Builds a scanner for the given provider from its registry descriptor,
    /// or `None` if the provider doesn't support token cost tracking.
    pub fn for_provider(id: quotawatch_core::ProviderKind) -> Option<Self> {
        use quotawatch_core::ProviderKind;

        let format = match id {
            ProviderKind::Claude => CostLogFormat::Claude,
            ProviderKind::Codex => CostLogFormat::Codex,
            _ => return None,
        };

        let desc = crate::registry::ProviderRegistry::get(id)?;
        let log_dir_fn = desc.token_cost.log_directory?;
        Some(Self::new(format, log_dir_fn()))
    }

    /// Returns the current cost snapshot, rescanning logs if the cache is
    /// stale or `force_refresh` is set.
    pub fn scan(&self, force_refresh: bool) -> Result<CostUsageSnapshot, CostScanError> {
        {
            let cache = self.cache.lock().unwrap();
            if !force_refresh {
                if let Some((scanned_at, snapshot)) = cache.as_ref() {
                    if scanned_at.elapsed() < MIN_RESCAN_INTERVAL {
                        return Ok(snapshot.clone());
                    }
                }
            }
        }

        let snapshot = self.scan_now()?;
        let mut cache = self.cache.lock().unwrap();
        *cache = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }

    fn scan_now(&self) -> Result<CostUsageSnapshot, CostScanError> {
        let bounds = DayBounds::today();
        let mut days: HashMap<NaiveDate, DailyAccumulator> = HashMap::new();

        let mut any_root = false;
        for root in &self.roots {
            if !root.exists() {
                continue;
            }
            any_root = true;

            let files = enumerate_jsonl_files(root)?;
            debug!(root = %root.display(), files = files.len(), "scanning cost logs");

            for file in files {
                match self.format {
                    CostLogFormat::Claude => scan_claude_file(&file, &bounds, &mut days),
                    CostLogFormat::Codex => scan_codex_file(&file, &bounds, &mut days),
                }
            }
        }

        if !any_root {
            return Err(CostScanError::NoLogDirectory);
        }

        Ok(build_snapshot(&bounds, days))
    }
}

fn build_snapshot(bounds: &DayBounds, days: HashMap<NaiveDate, DailyAccumulator>) -> CostUsageSnapshot {
    let mut daily: Vec<(NaiveDate, DailyCost)> = days
        .into_iter()
        .map(|(date, acc)| (date, acc.into_daily_cost(date.format("%Y-%m-%d").to_string())))
        .collect();
    daily.sort_by(|a, b| b.0.cmp(&a.0));

    let today = daily
        .iter()
        .find(|(d, _)| *d == bounds.today)
        .map(|(_, c)| c.clone())
        .unwrap_or_else(|| DailyCost::new(bounds.today.format("%Y-%m-%d").to_string()));

    let last_7_days = rollup(&daily, bounds.week_start, bounds.today, "last_7_days");
    let last_30_days = rollup(&daily, bounds.month_start, bounds.today, "last_30_days");

    CostUsageSnapshot {
        today,
        last_7_days,
        last_30_days,
        daily: daily.into_iter().map(|(_, c)| c).collect(),
        scanned_at: chrono::Utc::now(),
    }
}

fn rollup(daily: &[(NaiveDate, DailyCost)], start: NaiveDate, end: NaiveDate, label: &str) -> DailyCost {
    let mut out = DailyCost::new(label.to_string());
    for (date, cost) in daily {
        if *date < start || *date > end {
            continue;
        }
        out.input_tokens += cost.input_tokens;
        out.output_tokens += cost.output_tokens;
        out.cache_read_tokens += cost.cache_read_tokens;
        out.cache_write_tokens += cost.cache_write_tokens;
        out.reasoning_tokens += cost.reasoning_tokens;
        out.cost_usd += cost.cost_usd;
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn test_claude_dedup_by_message_and_request_id() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let line = format!(
            r#"{{"timestamp":"{now}","requestId":"req-1","message":{{"id":"msg-1","model":"claude-sonnet-4","usage":{{"input_tokens":100,"output_tokens":50}}}}}}"#
        );
        write_lines(dir.path(), "session.jsonl", &[&line, &line, &line]);

        let bounds = DayBounds::today();
        let mut days = HashMap::new();
        scan_claude_file(&dir.path().join("session.jsonl"), &bounds, &mut days);

        let acc = days.get(&bounds.today).unwrap();
        assert_eq!(acc.input_tokens, 100);
        assert_eq!(acc.output_tokens, 50);
    }

    #[test]
    fn test_claude_drops_zero_usage_lines() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let line = format!(
            r#"{{"timestamp":"{now}","requestId":"req-1","message":{{"id":"msg-1","model":"claude-sonnet-4","usage":{{"input_tokens":0,"output_tokens":0}}}}}}"#
        );
        write_lines(dir.path(), "session.jsonl", &[&line]);

        let bounds = DayBounds::today();
        let mut days = HashMap::new();
        scan_claude_file(&dir.path().join("session.jsonl"), &bounds, &mut days);

        assert!(days.is_empty());
    }

    #[test]
    fn test_codex_supersedes_within_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let repeated = format!(
            r#"{{"type":"token_count","timestamp":"{now}","payload":{{"info":{{"total_token_usage":{{"input_tokens":100,"output_tokens":50}}}}}}}}"#
        );
        let advanced = format!(
            r#"{{"type":"token_count","timestamp":"{now}","payload":{{"info":{{"total_token_usage":{{"input_tokens":200,"output_tokens":120}}}}}}}}"#
        );
        write_lines(
            dir.path(),
            "session.jsonl",
            &[&repeated, &repeated, &repeated, &advanced],
        );

        let bounds = DayBounds::today();
        let mut days = HashMap::new();
        scan_codex_file(&dir.path().join("session.jsonl"), &bounds, &mut days);

        let acc = days.get(&bounds.today).unwrap();
        assert_eq!(acc.input_tokens, 200);
        assert_eq!(acc.output_tokens, 120);
    }

    #[test]
    fn test_codex_sums_across_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let a = format!(
            r#"{{"type":"token_count","timestamp":"{now}","payload":{{"info":{{"total_token_usage":{{"input_tokens":100,"output_tokens":50}}}}}}}}"#
        );
        let b = format!(
            r#"{{"type":"token_count","timestamp":"{now}","payload":{{"info":{{"total_token_usage":{{"input_tokens":40,"output_tokens":20}}}}}}}}"#
        );
        write_lines(dir.path(), "a.jsonl", &[&a]);
        write_lines(dir.path(), "b.jsonl", &[&b]);

        let bounds = DayBounds::today();
        let mut days = HashMap::new();
        scan_codex_file(&dir.path().join("a.jsonl"), &bounds, &mut days);
        scan_codex_file(&dir.path().join("b.jsonl"), &bounds, &mut days);

        let acc = days.get(&bounds.today).unwrap();
        assert_eq!(acc.input_tokens, 140);
        assert_eq!(acc.output_tokens, 70);
    }

    #[test]
    fn test_local_day_key_respects_timezone_boundary() {
        // A UTC timestamp near midnight can fall on a different local day.
        std::env::set_var("TZ", "America/Los_Angeles");
        let key = local_day_key("2026-02-16T23:45:00Z");
        assert!(key.is_some());
    }

    #[test]
    fn test_claude_tier_fallback_is_sonnet() {
        let tier = claude_tier("some-unrecognized-model");
        assert_eq!(tier.input, CLAUDE_SONNET.input);
    }

    #[test]
    fn test_enumerate_skips_hidden_and_package_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        write_lines(&dir.path().join(".hidden"), "x.jsonl", &["{}"]);
        write_lines(dir.path(), "visible.jsonl", &["{}"]);

        let files = enumerate_jsonl_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.jsonl"));
    }

    #[test]
    fn test_scanner_cache_gate() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = CostScanner::new(CostLogFormat::Claude, vec![dir.path().to_path_buf()]);
        let first = scanner.scan(false).unwrap();
        let second = scanner.scan(false).unwrap();
        assert_eq!(first.scanned_at, second.scanned_at);
    }
}
