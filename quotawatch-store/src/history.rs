//! Relational history store.
//!
//! Backs the three durable tables the application needs across restarts:
//! a time series of usage snapshots (`usage_records`), the set of accounts
//! ever seen per provider with which one is currently active (`accounts`),
//! and a log of delivered/attempted notifications (`notification_history`).
//!
//! Unlike [`crate::usage_store::UsageStore`] (in-memory, watch-channel driven,
//! lost on exit), this store is the on-disk record: every fetch cycle appends
//! a `usage_records` row, and only `set_active_account` mutates `accounts` in
//! place.

use chrono::{DateTime, Utc};
use quotawatch_core::ProviderKind;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS usage_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    account_id INTEGER,
    timestamp TEXT NOT NULL,
    primary_used_percent REAL,
    secondary_used_percent REAL,
    cost_usd REAL,
    tokens_used INTEGER,
    models_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_usage_records_provider_timestamp
    ON usage_records (provider, timestamp);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    email TEXT,
    display_name TEXT NOT NULL,
    auth_method TEXT NOT NULL,
    keychain_id TEXT,
    is_active INTEGER NOT NULL DEFAULT 0,
    added_at TEXT NOT NULL,
    last_used_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_accounts_provider ON accounts (provider);

CREATE TABLE IF NOT EXISTS notification_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    provider TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    was_delivered INTEGER NOT NULL,
    metadata_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_notification_history_timestamp
    ON notification_history (timestamp);
";

// ============================================================================
// Row types
// ============================================================================

/// A single recorded usage data point.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    /// Row id.
    pub id: i64,
    /// Provider the record belongs to.
    pub provider: ProviderKind,
    /// Active account at the time of capture, if known.
    pub account_id: Option<i64>,
    /// When the snapshot was fetched.
    pub timestamp: DateTime<Utc>,
    /// Primary window's used percent.
    pub primary_used_percent: Option<f64>,
    /// Secondary window's used percent.
    pub secondary_used_percent: Option<f64>,
    /// Cost in USD, if the provider reports one.
    pub cost_usd: Option<f64>,
    /// Token count, if the provider reports one.
    pub tokens_used: Option<i64>,
    /// Per-model breakdown, serialized as JSON.
    pub models_json: Option<String>,
}

/// Fields needed to insert a new `usage_records` row.
#[derive(Debug, Clone)]
pub struct NewUsageRecord {
    /// Provider the record belongs to.
    pub provider: ProviderKind,
    /// Active account at the time of capture, if known.
    pub account_id: Option<i64>,
    /// When the snapshot was fetched.
    pub timestamp: DateTime<Utc>,
    /// Primary window's used percent.
    pub primary_used_percent: Option<f64>,
    /// Secondary window's used percent.
    pub secondary_used_percent: Option<f64>,
    /// Cost in USD, if the provider reports one.
    pub cost_usd: Option<f64>,
    /// Token count, if the provider reports one.
    pub tokens_used: Option<i64>,
    /// Per-model breakdown, serialized as JSON.
    pub models_json: Option<String>,
}

/// A stored account for a provider.
#[derive(Debug, Clone)]
pub struct Account {
    /// Row id.
    pub id: i64,
    /// Provider this account belongs to.
    pub provider: ProviderKind,
    /// Account email, if known.
    pub email: Option<String>,
    /// Human-readable label for the account.
    pub display_name: String,
    /// How this account authenticates (e.g. "oauth", "api_key", "cli").
    pub auth_method: String,
    /// Opaque id of the matching keychain entry, if credentials are stored there.
    pub keychain_id: Option<String>,
    /// Whether this is the provider's currently active account.
    pub is_active: bool,
    /// When the account was first seen.
    pub added_at: DateTime<Utc>,
    /// When the account was last used for a fetch, if ever.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Fields needed to insert a new `accounts` row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Provider this account belongs to.
    pub provider: ProviderKind,
    /// Account email, if known.
    pub email: Option<String>,
    /// Human-readable label for the account.
    pub display_name: String,
    /// How this account authenticates.
    pub auth_method: String,
    /// Opaque id of the matching keychain entry, if any.
    pub keychain_id: Option<String>,
}

/// A logged notification attempt.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    /// Row id.
    pub id: i64,
    /// Notification category (e.g. "threshold", "error", "reset").
    pub kind: String,
    /// Provider the notification concerns.
    pub provider: ProviderKind,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// When the notification was generated.
    pub timestamp: DateTime<Utc>,
    /// Whether the OS notifier actually delivered it.
    pub was_delivered: bool,
    /// Extra context, serialized as JSON.
    pub metadata_json: Option<String>,
}

/// Fields needed to insert a new `notification_history` row.
#[derive(Debug, Clone)]
pub struct NewNotification {
    /// Notification category.
    pub kind: String,
    /// Provider the notification concerns.
    pub provider: ProviderKind,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Whether the OS notifier actually delivered it.
    pub was_delivered: bool,
    /// Extra context, serialized as JSON.
    pub metadata_json: Option<String>,
}

// ============================================================================
// Store
// ============================================================================

/// Relational store over the three durable history tables.
///
/// Wraps a single `rusqlite` connection behind a mutex; callers invoke its
/// methods from `tokio::task::spawn_blocking` when calling from async code,
/// the same way [`quotawatch_fetch::host::pty`] drives its blocking PTY I/O.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Opens (creating if needed) the history database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory database, for tests and ephemeral sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        debug!("history store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ------------------------------------------------------------------
    // usage_records
    // ------------------------------------------------------------------

    /// Appends a usage snapshot to the time series.
    pub fn record_usage(&self, record: &NewUsageRecord) -> Result<i64, StoreError> {
        let conn = self.conn.lock().expect("history store mutex poisoned");
        conn.execute(
            "INSERT INTO usage_records
                (provider, account_id, timestamp, primary_used_percent,
                 secondary_used_percent, cost_usd, tokens_used, models_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.provider.cli_name(),
                record.account_id,
                record.timestamp.to_rfc3339(),
                record.primary_used_percent,
                record.secondary_used_percent,
                record.cost_usd,
                record.tokens_used,
                record.models_json,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the most recent `limit` usage records for `provider`, newest first.
    pub fn usage_history(
        &self,
        provider: ProviderKind,
        limit: usize,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        let conn = self.conn.lock().expect("history store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, provider, account_id, timestamp, primary_used_percent,
                    secondary_used_percent, cost_usd, tokens_used, models_json
             FROM usage_records
             WHERE provider = ?1
             ORDER BY timestamp DESC
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![provider.cli_name(), limit as i64], row_to_usage_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ------------------------------------------------------------------
    // accounts
    // ------------------------------------------------------------------

    /// Inserts a new account row. Does not affect which account is active.
    pub fn add_account(&self, account: &NewAccount) -> Result<i64, StoreError> {
        let conn = self.conn.lock().expect("history store mutex poisoned");
        conn.execute(
            "INSERT INTO accounts
                (provider, email, display_name, auth_method, keychain_id, is_active, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                account.provider.cli_name(),
                account.email,
                account.display_name,
                account.auth_method,
                account.keychain_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Atomically makes `account_id` the sole active account for `provider`:
    /// clears `is_active` on every other account of that provider first.
    pub fn set_active_account(
        &self,
        provider: ProviderKind,
        account_id: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().expect("history store mutex poisoned");
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE accounts SET is_active = 0 WHERE provider = ?1",
            params![provider.cli_name()],
        )?;
        let updated = tx.execute(
            "UPDATE accounts SET is_active = 1, last_used_at = ?1
             WHERE id = ?2 AND provider = ?3",
            params![Utc::now().to_rfc3339(), account_id, provider.cli_name()],
        )?;

        if updated == 0 {
            return Err(StoreError::ProviderNotFound(format!(
                "no account {account_id} for provider {provider}"
            )));
        }

        tx.commit()?;
        Ok(())
    }

    /// Returns every account on file for `provider`.
    pub fn accounts_for(&self, provider: ProviderKind) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn.lock().expect("history store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, provider, email, display_name, auth_method, keychain_id,
                    is_active, added_at, last_used_at
             FROM accounts WHERE provider = ?1 ORDER BY added_at ASC",
        )?;
        let rows = stmt
            .query_map(params![provider.cli_name()], row_to_account)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Returns the currently active account for `provider`, if any.
    pub fn active_account(&self, provider: ProviderKind) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock().expect("history store mutex poisoned");
        conn.query_row(
            "SELECT id, provider, email, display_name, auth_method, keychain_id,
                    is_active, added_at, last_used_at
             FROM accounts WHERE provider = ?1 AND is_active = 1",
            params![provider.cli_name()],
            row_to_account,
        )
        .optional()
        .map_err(StoreError::from)
    }

    // ------------------------------------------------------------------
    // notification_history
    // ------------------------------------------------------------------

    /// Logs a notification attempt.
    pub fn record_notification(&self, notification: &NewNotification) -> Result<i64, StoreError> {
        let conn = self.conn.lock().expect("history store mutex poisoned");
        conn.execute(
            "INSERT INTO notification_history
                (type, provider, title, body, timestamp, was_delivered, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                notification.kind,
                notification.provider.cli_name(),
                notification.title,
                notification.body,
                Utc::now().to_rfc3339(),
                notification.was_delivered as i64,
                notification.metadata_json,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the most recent `limit` notifications across all providers, newest first.
    pub fn recent_notifications(
        &self,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let conn = self.conn.lock().expect("history store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, type, provider, title, body, timestamp, was_delivered, metadata_json
             FROM notification_history
             ORDER BY timestamp DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_notification)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn parse_provider(s: String) -> rusqlite::Result<ProviderKind> {
    ProviderKind::from_str(&s).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown provider: {s}").into(),
        )
    })
}

fn parse_timestamp(s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn row_to_usage_record(row: &rusqlite::Row) -> rusqlite::Result<UsageRecord> {
    Ok(UsageRecord {
        id: row.get(0)?,
        provider: parse_provider(row.get(1)?)?,
        account_id: row.get(2)?,
        timestamp: parse_timestamp(row.get(3)?)?,
        primary_used_percent: row.get(4)?,
        secondary_used_percent: row.get(5)?,
        cost_usd: row.get(6)?,
        tokens_used: row.get(7)?,
        models_json: row.get(8)?,
    })
}

fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    let last_used_at: Option<String> = row.get(8)?;
    Ok(Account {
        id: row.get(0)?,
        provider: parse_provider(row.get(1)?)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        auth_method: row.get(4)?,
        keychain_id: row.get(5)?,
        is_active: row.get::<_, i64>(6)? != 0,
        added_at: parse_timestamp(row.get(7)?)?,
        last_used_at: last_used_at.map(|s| parse_timestamp(s)).transpose()?,
    })
}

fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.get(0)?,
        kind: row.get(1)?,
        provider: parse_provider(row.get(2)?)?,
        title: row.get(3)?,
        body: row.get(4)?,
        timestamp: parse_timestamp(row.get(5)?)?,
        was_delivered: row.get::<_, i64>(6)? != 0,
        metadata_json: row.get(7)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
