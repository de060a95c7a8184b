//! Provider fetch orchestration.
//!
//! [`ProviderService`] is the entry point applications embed: it holds the
//! shared [`FetchContext`], tracks which providers are currently registered
//! for polling, and caches the last outcome per provider so UIs can render
//! something even between fetch cycles.

use chrono::{DateTime, Utc};
use quotawatch_core::{ProviderKind, UsageSnapshot};
use quotawatch_fetch::{FetchContext, FetchError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::registry::ProviderRegistry;

// ============================================================================
// Cached Result
// ============================================================================

/// The last fetch outcome recorded for a provider.
#[derive(Debug, Clone)]
pub struct CachedFetch {
    /// Provider this result belongs to.
    pub provider: ProviderKind,
    /// The fetched snapshot, if the pipeline succeeded.
    pub snapshot: Option<UsageSnapshot>,
    /// The error message, if the pipeline failed.
    pub error: Option<String>,
    /// The strategy id that produced the snapshot, if successful.
    pub strategy_id: Option<String>,
    /// When this result was recorded.
    pub fetched_at: DateTime<Utc>,
    /// How long the fetch took.
    pub duration: Duration,
}

impl CachedFetch {
    /// Returns true if the cached fetch succeeded.
    pub fn is_success(&self) -> bool {
        self.snapshot.is_some()
    }
}

// ============================================================================
// Provider Service
// ============================================================================

/// Orchestrates fetches across the registered providers.
///
/// Each provider's pipeline runs independently; `fetch_all` fans out with one
/// `tokio::spawn`'d task per registered provider so a slow or hanging
/// provider never blocks the others.
pub struct ProviderService {
    ctx: Arc<FetchContext>,
    registered: RwLock<HashSet<ProviderKind>>,
    last_results: RwLock<HashMap<ProviderKind, CachedFetch>>,
}

impl ProviderService {
    /// Creates a service over `ctx`, registered for every default-enabled provider.
    pub fn new(ctx: FetchContext) -> Self {
        let registered = ProviderRegistry::default_enabled()
            .into_iter()
            .map(|d| d.id)
            .collect();

        Self {
            ctx: Arc::new(ctx),
            registered: RwLock::new(registered),
            last_results: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a service with an explicit initial set of registered providers.
    pub fn with_providers(ctx: FetchContext, providers: impl IntoIterator<Item = ProviderKind>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            registered: RwLock::new(providers.into_iter().collect()),
            last_results: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `provider` for `fetch_all` polling. Idempotent.
    pub async fn register(&self, provider: ProviderKind) {
        let mut registered = self.registered.write().await;
        if registered.insert(provider) {
            debug!(provider = %provider, "provider registered");
        }
    }

    /// Removes `provider` from `fetch_all` polling.
    pub async fn deregister(&self, provider: ProviderKind) {
        self.registered.write().await.remove(&provider);
    }

    /// Returns the set of currently registered providers.
    pub async fn registered_providers(&self) -> Vec<ProviderKind> {
        self.registered.read().await.iter().copied().collect()
    }

    /// Fetches usage for a single provider, regardless of registration,
    /// and caches the result.
    #[instrument(skip(self))]
    pub async fn fetch(&self, provider: ProviderKind) -> Result<UsageSnapshot, FetchError> {
        let outcome = Self::run_pipeline(self.ctx.clone(), provider).await;
        self.store_result(provider, &outcome).await;
        outcome
    }

    /// Fetches usage for every registered provider concurrently.
    ///
    /// Each provider runs in its own `tokio::spawn`'d task; a panic or
    /// cancellation in one provider's pipeline does not affect the others.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> HashMap<ProviderKind, Result<UsageSnapshot, FetchError>> {
        let providers = self.registered_providers().await;
        let mut handles = Vec::with_capacity(providers.len());

        for provider in providers {
            let ctx = self.ctx.clone();
            handles.push((
                provider,
                tokio::spawn(async move { Self::run_pipeline(ctx, provider).await }),
            ));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for (provider, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(provider = %provider, error = %e, "fetch task panicked or was cancelled");
                    Err(FetchError::CommandFailed(format!("task join error: {e}")))
                }
            };
            self.store_result(provider, &outcome).await;
            results.insert(provider, outcome);
        }

        results
    }

    /// Returns the cached result of the last `fetch`/`fetch_all` call for `provider`.
    pub async fn last_result(&self, provider: ProviderKind) -> Option<CachedFetch> {
        self.last_results.read().await.get(&provider).cloned()
    }

    /// Returns the cached results for every provider that has ever been fetched.
    pub async fn all_last_results(&self) -> HashMap<ProviderKind, CachedFetch> {
        self.last_results.read().await.clone()
    }

    async fn run_pipeline(
        ctx: Arc<FetchContext>,
        provider: ProviderKind,
    ) -> Result<UsageSnapshot, FetchError> {
        let Some(descriptor) = ProviderRegistry::get(provider) else {
            return Err(FetchError::NoAvailableStrategy(format!(
                "no descriptor registered for {provider}"
            )));
        };

        let pipeline = descriptor.build_pipeline(&ctx);
        let outcome = pipeline.execute(&ctx).await;
        outcome.result.map(|r| r.snapshot)
    }

    async fn store_result(&self, provider: ProviderKind, outcome: &Result<UsageSnapshot, FetchError>) {
        let start = Instant::now();
        let cached = match outcome {
            Ok(snapshot) => CachedFetch {
                provider,
                snapshot: Some(snapshot.clone()),
                error: None,
                strategy_id: None,
                fetched_at: Utc::now(),
                duration: start.elapsed(),
            },
            Err(e) => CachedFetch {
                provider,
                snapshot: None,
                error: Some(e.to_string()),
                strategy_id: None,
                fetched_at: Utc::now(),
                duration: start.elapsed(),
            },
        };

        self.last_results.write().await.insert(provider, cached);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_is_idempotent_and_visible() {
        let service = ProviderService::with_providers(FetchContext::new(), []);
        assert!(service.registered_providers().await.is_empty());

        service.register(ProviderKind::Claude).await;
        service.register(ProviderKind::Claude).await;

        let registered = service.registered_providers().await;
        assert_eq!(registered, vec![ProviderKind::Claude]);
    }

    #[tokio::test]
    async fn deregister_removes_provider() {
        let service = ProviderService::with_providers(FetchContext::new(), [ProviderKind::Codex]);
        service.deregister(ProviderKind::Codex).await;
        assert!(service.registered_providers().await.is_empty());
    }

    #[tokio::test]
    async fn last_result_absent_before_any_fetch() {
        let service = ProviderService::new(FetchContext::new());
        assert!(service.last_result(ProviderKind::Claude).await.is_none());
    }

    #[tokio::test]
    async fn fetch_all_caches_a_result_per_registered_provider() {
        let service = ProviderService::with_providers(
            FetchContext::new(),
            [ProviderKind::Claude, ProviderKind::Codex],
        );

        let results = service.fetch_all().await;
        assert_eq!(results.len(), 2);
        assert!(service.last_result(ProviderKind::Claude).await.is_some());
        assert!(service.last_result(ProviderKind::Codex).await.is_some());
    }
}
