//! Antigravity provider descriptor.

use quotawatch_core::{ProviderKind, ProviderMetadata};
use quotawatch_fetch::{FetchContext, FetchPipeline, SourceMode};

use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor, TokenCostConfig};
use super::strategies::AntigravityLocalStrategy;

/// Builds the provider descriptor for Antigravity.
pub fn antigravity_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Antigravity,
        metadata: antigravity_metadata(),
        token_cost: TokenCostConfig::default(),
        fetch_plan: antigravity_fetch_plan(),
        cli: antigravity_cli_config(),
    }
}

fn antigravity_metadata() -> ProviderMetadata {
    ProviderMetadata {
        id: ProviderKind::Antigravity,
        display_name: "Antigravity".to_string(),
        primary_label: "Session".to_string(),
        secondary_label: "Daily".to_string(),
        tertiary_label: Some("Gemini Flash".to_string()),
        supports_tertiary: true,
        supports_credits: false,
        cli_name: "antigravity".to_string(),
        default_enabled: false,
        is_primary_provider: false,
    }
}

fn antigravity_fetch_plan() -> FetchPlan {
    FetchPlan {
        source_modes: vec![SourceMode::Auto],
        build_pipeline: build_antigravity_pipeline,
    }
}

fn build_antigravity_pipeline(_ctx: &FetchContext) -> FetchPipeline {
    let strategies: Vec<Box<dyn quotawatch_fetch::FetchStrategy>> = vec![
        Box::new(AntigravityLocalStrategy::new()),
    ];

    FetchPipeline::with_strategies(strategies)
}

fn antigravity_cli_config() -> CliConfig {
    CliConfig {
        name: "antigravity",
        aliases: &[],
        version_args: &["--version"],
        usage_args: &[],
    }
}
