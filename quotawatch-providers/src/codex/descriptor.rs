//! Codex provider descriptor.

use quotawatch_core::{ProviderKind, ProviderMetadata};
use quotawatch_fetch::{FetchContext, FetchPipeline, SourceMode};
use std::path::PathBuf;

use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor, TokenCostConfig};
use super::strategies::CodexOAuthStrategy;

/// Creates the Codex provider descriptor.
pub fn codex_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Codex,
        metadata: codex_metadata(),
        token_cost: codex_token_cost(),
        fetch_plan: codex_fetch_plan(),
        cli: codex_cli_config(),
    }
}

/// Codex metadata configuration.
fn codex_metadata() -> ProviderMetadata {
    ProviderMetadata {
        id: ProviderKind::Codex,
        display_name: "Codex".to_string(),
        primary_label: "Session".to_string(),
        secondary_label: "Weekly".to_string(),
        tertiary_label: None,
        supports_tertiary: false,
        supports_credits: true,
        cli_name: "codex".to_string(),
        default_enabled: true,
        is_primary_provider: true,
    }
}

/// Codex token cost configuration.
fn codex_token_cost() -> TokenCostConfig {
    TokenCostConfig {
        supports_token_cost: true,
        log_directory: Some(codex_log_directory),
    }
}

/// Returns the Codex log root, honoring `CODEX_HOME`.
fn codex_log_directory() -> Vec<PathBuf> {
    if let Ok(codex_home) = std::env::var("CODEX_HOME") {
        if !codex_home.is_empty() {
            return vec![PathBuf::from(codex_home).join("sessions")];
        }
    }
    dirs::home_dir()
        .map(|h| vec![h.join(".codex").join("sessions")])
        .unwrap_or_default()
}

/// Codex fetch plan.
fn codex_fetch_plan() -> FetchPlan {
    FetchPlan {
        source_modes: vec![SourceMode::OAuth],
        build_pipeline: build_codex_pipeline,
    }
}

/// Builds the Codex fetch pipeline.
fn build_codex_pipeline(ctx: &FetchContext) -> FetchPipeline {
    let mut strategies: Vec<Box<dyn quotawatch_fetch::FetchStrategy>> = Vec::new();

    if ctx.settings.source_mode.allows_oauth() {
        strategies.push(Box::new(CodexOAuthStrategy::new()));
    }

    FetchPipeline::with_strategies(strategies)
}

/// Codex CLI configuration, used only for version detection.
fn codex_cli_config() -> CliConfig {
    CliConfig {
        name: "codex",
        aliases: &["openai"],
        version_args: &["--version"],
        usage_args: &[],
    }
}
