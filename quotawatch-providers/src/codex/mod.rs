//! Codex (OpenAI/ChatGPT) provider implementation.
//!
//! Codex is authenticated purely via OAuth: there is no interactive usage
//! panel or browser-cookie path like Claude or Cursor have.
//!
//! ## Fetch Strategy
//!
//! - **OAuth Strategy** (priority 100): reads `~/.codex/auth.json` (or
//!   `$CODEX_HOME/auth.json`), accepting either the legacy `OPENAI_API_KEY`
//!   or a `tokens.{access_token, account_id}` pair, then calls
//!   `GET https://chatgpt.com/backend-api/wham/usage` with the bearer token.
//!
//! ## Authentication
//!
//! - Reads `~/.codex/auth.json` for account info.
//! - Extracts email and plan from the ID token JWT.
//!
//! ## Usage
//!
//! ```ignore
//! use quotawatch_providers::codex::CodexApiClient;
//! use quotawatch_providers::codex::auth::resolve_credentials;
//!
//! let credentials = resolve_credentials()?;
//! let response = CodexApiClient::new().fetch_usage(&credentials).await?;
//! let snapshot = response.to_snapshot();
//! ```

// Modules
pub mod api;
pub mod auth;
mod descriptor;
mod error;
mod strategies;

// Re-exports
pub use api::CodexApiClient;
pub use auth::{read_account_info, try_read_account_info, AccountInfo, CodexCredentials};
pub use descriptor::codex_descriptor;
pub use error::CodexError;
pub use strategies::CodexOAuthStrategy;
