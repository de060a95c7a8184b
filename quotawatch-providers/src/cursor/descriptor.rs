//! Cursor provider descriptor.

use quotawatch_core::{ProviderKind, ProviderMetadata};
use quotawatch_fetch::{FetchContext, FetchPipeline, SourceMode};
use std::path::PathBuf;

use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor, TokenCostConfig};
use super::strategies::{CursorLocalStrategy, CursorWebStrategy};

/// Creates the Cursor provider descriptor.
pub fn cursor_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Cursor,
        metadata: cursor_metadata(),
        token_cost: cursor_token_cost(),
        fetch_plan: cursor_fetch_plan(),
        cli: cursor_cli_config(),
    }
}

/// Cursor metadata configuration.
fn cursor_metadata() -> ProviderMetadata {
    ProviderMetadata {
        id: ProviderKind::Cursor,
        display_name: "Cursor".to_string(),
        primary_label: "Requests".to_string(),
        secondary_label: "Monthly".to_string(),
        tertiary_label: None,
        supports_tertiary: false,
        supports_credits: true,
        cli_name: "cursor".to_string(),
        default_enabled: false, // Not enabled by default
        is_primary_provider: false,
    }
}

/// Cursor token cost configuration.
fn cursor_token_cost() -> TokenCostConfig {
    TokenCostConfig {
        supports_token_cost: false, // Cursor uses credits, not tokens
        log_directory: None,
    }
}

/// Cursor fetch plan.
fn cursor_fetch_plan() -> FetchPlan {
    FetchPlan {
        source_modes: vec![SourceMode::Web, SourceMode::Auto],
        build_pipeline: build_cursor_pipeline,
    }
}

/// Builds the Cursor fetch pipeline.
fn build_cursor_pipeline(ctx: &FetchContext) -> FetchPipeline {
    let mut strategies: Vec<Box<dyn quotawatch_fetch::FetchStrategy>> = Vec::new();

    // Web cookie strategy (primary)
    if ctx.settings.source_mode.allows_web() {
        strategies.push(Box::new(CursorWebStrategy::new()));
    }

    // Local strategy (fallback)
    strategies.push(Box::new(CursorLocalStrategy::new()));

    FetchPipeline::with_strategies(strategies)
}

/// Cursor CLI configuration (limited - Cursor doesn't have a full CLI).
fn cursor_cli_config() -> CliConfig {
    CliConfig {
        name: "cursor",
        aliases: &[],
        version_args: &["--version"],
        usage_args: &[], // No CLI usage command
    }
}

/// Returns the Cursor configuration directory.
#[allow(dead_code)]
pub fn cursor_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support").join("Cursor"))
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|c| c.join("Cursor"))
    }

    #[cfg(target_os = "windows")]
    {
        dirs::config_dir().map(|c| c.join("Cursor"))
    }
}
