//! Gemini provider descriptor.

use quotawatch_core::{ProviderKind, ProviderMetadata};
use quotawatch_fetch::{FetchContext, FetchPipeline, SourceMode};

use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor, TokenCostConfig};
use super::strategies::{GeminiCliStrategy, GeminiOAuthStrategy};

/// Creates the Gemini provider descriptor.
pub fn gemini_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Gemini,
        metadata: gemini_metadata(),
        token_cost: TokenCostConfig::default(),
        fetch_plan: gemini_fetch_plan(),
        cli: gemini_cli_config(),
    }
}

fn gemini_metadata() -> ProviderMetadata {
    ProviderMetadata {
        id: ProviderKind::Gemini,
        display_name: "Gemini".to_string(),
        primary_label: "Pro".to_string(),
        secondary_label: "Flash".to_string(),
        tertiary_label: None,
        supports_tertiary: false,
        supports_credits: false,
        cli_name: "gemini".to_string(),
        default_enabled: false,
        is_primary_provider: false,
    }
}

fn gemini_fetch_plan() -> FetchPlan {
    FetchPlan {
        source_modes: vec![SourceMode::OAuth, SourceMode::CLI],
        build_pipeline: build_gemini_pipeline,
    }
}

fn build_gemini_pipeline(ctx: &FetchContext) -> FetchPipeline {
    let mut strategies: Vec<Box<dyn quotawatch_fetch::FetchStrategy>> = Vec::new();

    if ctx.settings.source_mode.allows_oauth() {
        strategies.push(Box::new(GeminiOAuthStrategy::new()));
    }

    if ctx.settings.source_mode.allows_cli() {
        strategies.push(Box::new(GeminiCliStrategy::new()));
    }

    FetchPipeline::with_strategies(strategies)
}

fn gemini_cli_config() -> CliConfig {
    CliConfig {
        name: "gemini",
        aliases: &["gcloud"],
        version_args: &["--version"],
        usage_args: &["usage"],
    }
}
