//! Codex fetch strategies.
//!
//! Codex has a single strategy: read OAuth credentials (or the legacy API
//! key) from `~/.codex/auth.json` and call the ChatGPT backend usage API
//! directly. There is no interactive CLI usage panel or browser-cookie path
//! for Codex, unlike Claude or Cursor.

use async_trait::async_trait;
use quotawatch_fetch::{FetchContext, FetchError, FetchKind, FetchResult, FetchStrategy};
use tracing::{debug, instrument};

use super::api::CodexApiClient;
use super::auth::{auth_file_path, resolve_credentials};

/// Codex OAuth strategy, reading bearer credentials from `auth.json`.
pub struct CodexOAuthStrategy;

impl CodexOAuthStrategy {
    /// Creates a new OAuth strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CodexOAuthStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for CodexOAuthStrategy {
    fn id(&self) -> &str {
        "codex.oauth"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::OAuth
    }

    #[instrument(skip(self, _ctx))]
    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        auth_file_path().is_some_and(|p| p.exists())
    }

    #[instrument(skip(self, _ctx))]
    async fn fetch(&self, _ctx: &FetchContext) -> Result<FetchResult, FetchError> {
        debug!("Fetching Codex usage via OAuth");

        let credentials = resolve_credentials()
            .map_err(|e| FetchError::InvalidCredentials(e.to_string()))?;

        let client = CodexApiClient::new();
        let response = client
            .fetch_usage(&credentials)
            .await
            .map_err(|e| FetchError::ApiError(e.to_string()))?;

        let snapshot = response.to_snapshot();

        Ok(FetchResult::new(snapshot, self.id(), self.kind()))
    }

    fn priority(&self) -> u32 {
        100
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_strategy_identity() {
        let strategy = CodexOAuthStrategy::new();
        assert_eq!(strategy.id(), "codex.oauth");
        assert_eq!(strategy.kind(), FetchKind::OAuth);
        assert_eq!(strategy.priority(), 100);
    }
}
