//! Copilot provider descriptor.

use quotawatch_core::{ProviderKind, ProviderMetadata};
use quotawatch_fetch::{FetchContext, FetchPipeline, SourceMode};

use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor, TokenCostConfig};
use super::strategies::{CopilotApiStrategy, CopilotEnvStrategy};

pub fn copilot_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Copilot,
        metadata: copilot_metadata(),
        token_cost: TokenCostConfig::default(),
        fetch_plan: copilot_fetch_plan(),
        cli: copilot_cli_config(),
    }
}

fn copilot_metadata() -> ProviderMetadata {
    ProviderMetadata {
        id: ProviderKind::Copilot,
        display_name: "Copilot".to_string(),
        primary_label: "Completions".to_string(),
        secondary_label: "Monthly".to_string(),
        tertiary_label: None,
        supports_tertiary: false,
        supports_credits: false,
        cli_name: "copilot".to_string(),
        default_enabled: false,
        is_primary_provider: false,
    }
}

fn copilot_fetch_plan() -> FetchPlan {
    FetchPlan {
        source_modes: vec![SourceMode::OAuth, SourceMode::ApiKey],
        build_pipeline: build_copilot_pipeline,
    }
}

fn build_copilot_pipeline(ctx: &FetchContext) -> FetchPipeline {
    let mut strategies: Vec<Box<dyn quotawatch_fetch::FetchStrategy>> = Vec::new();

    if ctx.settings.source_mode.allows_oauth() {
        strategies.push(Box::new(CopilotApiStrategy::new()));
    }

    if ctx.settings.source_mode.allows_api_key() {
        strategies.push(Box::new(CopilotEnvStrategy::new()));
    }

    FetchPipeline::with_strategies(strategies)
}

fn copilot_cli_config() -> CliConfig {
    CliConfig {
        name: "gh",
        aliases: &["copilot"],
        version_args: &["--version"],
        usage_args: &["copilot", "usage"],
    }
}
