//! Browser cookie extraction for web scraping strategies (Chromium-family only).
//!
//! Firefox and Safari store cookies unencrypted and are intentionally out of
//! scope: every provider that needs cookie auth (Cursor, Claude's web
//! fallback) targets sites that run fine against any Chromium-derived
//! browser, so there is no reason to carry two extra cookie-store formats.
//! Asking for a Firefox/Safari profile is rejected with
//! [`BrowserError::UnsupportedBrowser`].

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, instrument, trace};

use crate::error::BrowserError;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// PBKDF2 salt Chromium uses to derive the Safe Storage key.
const PBKDF2_SALT: &[u8] = b"saltysalt";

/// PBKDF2 iteration count Chromium uses on all platforms.
const PBKDF2_ITERATIONS: u32 = 1003;

/// Difference between the Windows FILETIME epoch (1601-01-01) and Unix epoch, in seconds.
const WINDOWS_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

// ============================================================================
// Browser enum
// ============================================================================

/// Supported Chromium-family browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    Chrome,
    ChromeBeta,
    ChromeCanary,
    Brave,
    Edge,
    Arc,
    Vivaldi,
    Opera,
}

impl Browser {
    /// Returns the display name for this browser.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Chrome => "Chrome",
            Self::ChromeBeta => "Chrome Beta",
            Self::ChromeCanary => "Chrome Canary",
            Self::Brave => "Brave",
            Self::Edge => "Edge",
            Self::Arc => "Arc",
            Self::Vivaldi => "Vivaldi",
            Self::Opera => "Opera",
        }
    }

    /// Parses a browser name, rejecting non-Chromium browsers explicitly.
    pub fn parse(name: &str) -> Result<Self, BrowserError> {
        match name.to_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "chrome-beta" | "chromebeta" => Ok(Self::ChromeBeta),
            "chrome-canary" | "chromecanary" | "canary" => Ok(Self::ChromeCanary),
            "brave" => Ok(Self::Brave),
            "edge" | "msedge" => Ok(Self::Edge),
            "arc" => Ok(Self::Arc),
            "vivaldi" => Ok(Self::Vivaldi),
            "opera" => Ok(Self::Opera),
            "firefox" | "safari" => Err(BrowserError::UnsupportedBrowser(name.to_string())),
            other => Err(BrowserError::UnsupportedBrowser(other.to_string())),
        }
    }

    /// Returns the cookie database path for this browser on macOS.
    #[cfg(target_os = "macos")]
    pub fn cookie_db_path(&self) -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let support = home.join("Library/Application Support");
        let path = match self {
            Self::Chrome => support.join("Google/Chrome/Default/Cookies"),
            Self::ChromeBeta => support.join("Google/Chrome Beta/Default/Cookies"),
            Self::ChromeCanary => support.join("Google/Chrome Canary/Default/Cookies"),
            Self::Brave => support.join("BraveSoftware/Brave-Browser/Default/Cookies"),
            Self::Edge => support.join("Microsoft Edge/Default/Cookies"),
            Self::Arc => support.join("Arc/User Data/Default/Cookies"),
            Self::Vivaldi => support.join("Vivaldi/Default/Cookies"),
            Self::Opera => support.join("com.operasoftware.Opera/Default/Cookies"),
        };
        Some(path)
    }

    /// Returns the cookie database path for this browser on Linux.
    #[cfg(target_os = "linux")]
    pub fn cookie_db_path(&self) -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let config = home.join(".config");
        let path = match self {
            Self::Chrome => config.join("google-chrome/Default/Cookies"),
            Self::ChromeBeta => config.join("google-chrome-beta/Default/Cookies"),
            Self::ChromeCanary => return None,
            Self::Brave => config.join("BraveSoftware/Brave-Browser/Default/Cookies"),
            Self::Edge => config.join("microsoft-edge/Default/Cookies"),
            Self::Arc => return None,
            Self::Vivaldi => config.join("vivaldi/Default/Cookies"),
            Self::Opera => config.join("opera/Cookies"),
        };
        Some(path)
    }

    /// Returns the cookie database path for this browser on Windows.
    #[cfg(target_os = "windows")]
    pub fn cookie_db_path(&self) -> Option<PathBuf> {
        let local_app_data = dirs::data_local_dir()?;
        let path = match self {
            Self::Chrome => local_app_data.join("Google/Chrome/User Data/Default/Network/Cookies"),
            Self::ChromeBeta => local_app_data.join("Google/Chrome Beta/User Data/Default/Network/Cookies"),
            Self::ChromeCanary => local_app_data.join("Google/Chrome SxS/User Data/Default/Network/Cookies"),
            Self::Brave => local_app_data.join("BraveSoftware/Brave-Browser/User Data/Default/Network/Cookies"),
            Self::Edge => local_app_data.join("Microsoft/Edge/User Data/Default/Network/Cookies"),
            Self::Arc => return None,
            Self::Vivaldi => local_app_data.join("Vivaldi/User Data/Default/Network/Cookies"),
            Self::Opera => local_app_data.join("Opera Software/Opera Stable/Network/Cookies"),
        };
        Some(path)
    }

    /// Check if this browser is installed.
    pub fn is_installed(&self) -> bool {
        self.cookie_db_path().is_some_and(|p| p.exists())
    }

    /// The service name under which the Safe Storage password is kept.
    fn safe_storage_service(&self) -> &'static str {
        match self {
            Self::Chrome | Self::ChromeBeta | Self::ChromeCanary => "Chrome Safe Storage",
            Self::Brave => "Brave Safe Storage",
            Self::Edge => "Microsoft Edge Safe Storage",
            Self::Arc => "Arc Safe Storage",
            Self::Vivaldi => "Vivaldi Safe Storage",
            Self::Opera => "Opera Safe Storage",
        }
    }

    /// Returns all supported browser variants.
    pub fn all() -> &'static [Browser] {
        &[
            Self::Chrome,
            Self::ChromeBeta,
            Self::ChromeCanary,
            Self::Brave,
            Self::Edge,
            Self::Arc,
            Self::Vivaldi,
            Self::Opera,
        ]
    }

    /// Default priority order for auto-detection.
    pub fn default_priority() -> &'static [Browser] {
        &[
            Self::Chrome,
            Self::Brave,
            Self::Edge,
            Self::Arc,
            Self::Vivaldi,
            Self::ChromeBeta,
            Self::ChromeCanary,
            Self::Opera,
        ]
    }
}

// ============================================================================
// Cookie
// ============================================================================

/// A decrypted browser cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_secure: bool,
    pub is_http_only: bool,
}

impl CookieRecord {
    /// Returns true if the cookie is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp < Utc::now())
    }

    /// Returns true if this cookie matches the given domain.
    pub fn matches_domain(&self, domain: &str) -> bool {
        let cookie_domain = self.domain.trim_start_matches('.');
        domain == cookie_domain
            || domain.ends_with(&format!(".{}", cookie_domain))
            || cookie_domain.ends_with(&format!(".{}", domain))
    }
}

// ============================================================================
// Browser Cookie Importer
// ============================================================================

/// API for importing cookies from a Chromium-family browser's profile.
#[derive(Debug, Clone, Default)]
pub struct BrowserCookieImporter;

impl BrowserCookieImporter {
    /// Creates a new browser cookie importer.
    pub fn new() -> Self {
        Self
    }

    /// Import cookies for a specific domain from a browser.
    #[instrument(skip(self), fields(browser = %browser.display_name(), domain = %domain))]
    pub async fn import_cookies(
        &self,
        browser: Browser,
        domain: &str,
    ) -> Result<Vec<CookieRecord>, BrowserError> {
        debug!("importing cookies");

        let db_path = browser
            .cookie_db_path()
            .ok_or_else(|| BrowserError::BrowserNotFound(browser.display_name().to_string()))?;

        if !db_path.exists() {
            return Err(BrowserError::DatabaseNotFound {
                browser: browser.display_name().to_string(),
                path: db_path.display().to_string(),
            });
        }

        let cookies = self.read_chromium_cookies(&db_path, domain, browser)?;
        let cookies: Vec<CookieRecord> =
            cookies.into_iter().filter(|c| !c.is_expired()).collect();

        if cookies.is_empty() {
            return Err(BrowserError::NoCookiesFound(domain.to_string()));
        }

        debug!(count = cookies.len(), "cookies imported");
        Ok(cookies)
    }

    /// Import cookies from the first available browser (in priority order).
    #[instrument(skip(self, priority), fields(domain = %domain))]
    pub async fn import_cookies_auto(
        &self,
        domain: &str,
        priority: &[Browser],
    ) -> Result<(Browser, Vec<CookieRecord>), BrowserError> {
        debug!("auto-importing cookies");

        let mut last_error = None;

        for browser in priority {
            match self.import_cookies(*browser, domain).await {
                Ok(cookies) => {
                    debug!(browser = %browser.display_name(), count = cookies.len(), "found cookies");
                    return Ok((*browser, cookies));
                }
                Err(e) => {
                    trace!(browser = %browser.display_name(), error = %e, "browser skipped");
                    last_error = Some(e);
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or(BrowserError::NoBrowsersAvailable))
    }

    /// Check which browsers are available.
    pub fn available_browsers(&self) -> Vec<Browser> {
        Browser::all()
            .iter()
            .filter(|b| b.is_installed())
            .copied()
            .collect()
    }

    /// Build a cookie header string for HTTP requests.
    pub fn cookies_to_header(cookies: &[CookieRecord]) -> String {
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Read a Chromium-based browser's cookie database for a domain.
    fn read_chromium_cookies(
        &self,
        db_path: &PathBuf,
        domain: &str,
        browser: Browser,
    ) -> Result<Vec<CookieRecord>, BrowserError> {
        debug!(path = %db_path.display(), browser = %browser.display_name(), "reading chromium cookies");

        let temp_path = copy_to_temp(db_path)?;

        let conn = Connection::open_with_flags(&temp_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| BrowserError::ReadFailed(format!("sqlite open error: {e}")));
        let conn = match conn {
            Ok(c) => c,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };

        let mut stmt = conn
            .prepare(
                "SELECT name, value, encrypted_value, host_key, path, expires_utc, is_secure, is_httponly
                 FROM cookies
                 WHERE host_key LIKE ?1",
            )
            .map_err(|e| BrowserError::ReadFailed(format!("prepare error: {e}")))?;

        let domain_pattern = format!("%{domain}");

        let rows: Vec<_> = stmt
            .query_map([&domain_pattern], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i32>(6)?,
                    row.get::<_, i32>(7)?,
                ))
            })
            .map_err(|e| BrowserError::ReadFailed(format!("query error: {e}")))?
            .filter_map(|r| r.ok())
            .collect();

        drop(stmt);
        drop(conn);
        let _ = fs::remove_file(&temp_path);

        let mut cookies = Vec::new();
        for (name, value, encrypted_value, host_key, path, expires_utc, is_secure, is_httponly) in
            rows
        {
            let expires_at = chromium_timestamp_to_utc(expires_utc);

            let cookie_value = if !value.is_empty() {
                value
            } else if !encrypted_value.is_empty() {
                match decrypt_chromium_cookie(&encrypted_value, browser) {
                    Ok(decrypted) => decrypted,
                    Err(e) => {
                        trace!(name = %name, error = %e, "failed to decrypt cookie, skipping");
                        continue;
                    }
                }
            } else {
                continue;
            };

            cookies.push(CookieRecord {
                name,
                value: cookie_value,
                domain: host_key,
                path,
                expires_at,
                is_secure: is_secure != 0,
                is_http_only: is_httponly != 0,
            });
        }

        Ok(cookies)
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Copy a database file to a temp location to avoid locking issues.
fn copy_to_temp(source: &PathBuf) -> Result<PathBuf, BrowserError> {
    let temp_dir = std::env::temp_dir();
    let temp_name = format!("quotawatch_cookies_{}.sqlite", std::process::id());
    let temp_path = temp_dir.join(temp_name);

    fs::copy(source, &temp_path)
        .map_err(|e| BrowserError::ReadFailed(format!("failed to copy database: {e}")))?;

    Ok(temp_path)
}

/// Converts a Chromium `expires_utc` column (microseconds since 1601-01-01) to UTC.
fn chromium_timestamp_to_utc(expires_utc: i64) -> Option<DateTime<Utc>> {
    if expires_utc <= 0 {
        return None;
    }
    let unix_secs = expires_utc / 1_000_000 - WINDOWS_EPOCH_OFFSET_SECS;
    Utc.timestamp_opt(unix_secs, 0).single()
}

/// Reads the browser's Safe Storage password from the OS credential store.
fn safe_storage_password(browser: Browser) -> Result<String, BrowserError> {
    let entry = keyring::Entry::new(browser.safe_storage_service(), "")
        .map_err(|e| BrowserError::AccessDenied(e.to_string()))?;
    entry
        .get_password()
        .map_err(|e| BrowserError::AccessDenied(e.to_string()))
}

/// Derives the 16-byte AES key Chromium uses from the Safe Storage password.
fn derive_key(password: &str) -> [u8; 16] {
    let mut key = [0u8; 16];
    ring::pbkdf2::derive(
        ring::pbkdf2::PBKDF2_HMAC_SHA1,
        std::num::NonZeroU32::new(PBKDF2_ITERATIONS).expect("nonzero iteration count"),
        PBKDF2_SALT,
        password.as_bytes(),
        &mut key,
    );
    key
}

/// Decrypts a Chromium `v10`/`v11` encrypted cookie value and recovers its
/// plaintext, stripping the well-known leading IV artifact.
fn decrypt_chromium_cookie(encrypted: &[u8], browser: Browser) -> Result<String, BrowserError> {
    if encrypted.is_empty() {
        return Ok(String::new());
    }
    if encrypted.len() < 4 {
        return Err(BrowserError::DecryptionFailed("data too short".to_string()));
    }

    let version = &encrypted[0..3];
    if version != b"v10" && version != b"v11" {
        return Err(BrowserError::DecryptionFailed(format!(
            "unknown encryption version: {version:?}"
        )));
    }

    if encrypted.len() < 19 {
        return Err(BrowserError::DecryptionFailed(
            "missing embedded IV".to_string(),
        ));
    }

    let iv = &encrypted[3..19];
    let ciphertext = &encrypted[19..];

    let password = safe_storage_password(browser)?;
    let key = derive_key(&password);

    let mut buf = ciphertext.to_vec();
    let decrypted = Aes128CbcDec::new(&key.into(), iv.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| BrowserError::DecryptionFailed(format!("aes error: {e}")))?;

    Ok(strip_iv_artifact(decrypted))
}

/// Post-processes decrypted plaintext to strip the well-known first-16-byte
/// IV artifact some Chromium builds leave in the output: prefer a clean
/// UTF-8 parse starting with an alphanumeric or underscore, otherwise skip
/// the first 16 bytes and take the longest printable-ASCII run.
fn strip_iv_artifact(plaintext: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(plaintext) {
        if text
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            return text.to_string();
        }
    }

    let tail = if plaintext.len() > 16 {
        &plaintext[16..]
    } else {
        plaintext
    };

    longest_printable_ascii_run(tail).unwrap_or_default()
}

/// Finds the longest contiguous run of printable ASCII (>= 10 chars).
fn longest_printable_ascii_run(bytes: &[u8]) -> Option<String> {
    let mut best: Option<&[u8]> = None;
    let mut start = 0;

    let is_printable = |b: u8| (0x20..=0x7e).contains(&b);

    let mut i = 0;
    while i <= bytes.len() {
        let at_boundary = i == bytes.len() || !is_printable(bytes[i]);
        if at_boundary {
            let run = &bytes[start..i];
            if run.len() >= 10 && best.is_none_or(|b| run.len() > b.len()) {
                best = Some(run);
            }
            start = i + 1;
        }
        i += 1;
    }

    best.map(|b| String::from_utf8_lossy(b).to_string())
}

// ============================================================================
// Tests
// ============================================================================
