//! Claude provider descriptor.

use quotawatch_core::{ProviderKind, ProviderMetadata};
use quotawatch_fetch::{FetchContext, FetchPipeline, SourceMode};
use std::path::PathBuf;

use crate::descriptor::{CliConfig, FetchPlan, ProviderDescriptor, TokenCostConfig};
use super::strategies::{ClaudeCliStrategy, ClaudeOAuthStrategy, ClaudePtyStrategy, ClaudeWebStrategy};

/// Creates the Claude provider descriptor.
pub fn claude_descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        id: ProviderKind::Claude,
        metadata: claude_metadata(),
        token_cost: claude_token_cost(),
        fetch_plan: claude_fetch_plan(),
        cli: claude_cli_config(),
    }
}

/// Claude metadata configuration.
fn claude_metadata() -> ProviderMetadata {
    ProviderMetadata {
        id: ProviderKind::Claude,
        display_name: "Claude".to_string(),
        primary_label: "Session".to_string(),
        secondary_label: "Weekly".to_string(),
        tertiary_label: Some("Opus".to_string()),
        supports_tertiary: true,
        supports_credits: false,
        cli_name: "claude".to_string(),
        default_enabled: true,
        is_primary_provider: true,
    }
}

/// Claude token cost configuration.
fn claude_token_cost() -> TokenCostConfig {
    TokenCostConfig {
        supports_token_cost: true,
        log_directory: Some(claude_log_directory),
    }
}

/// Returns the Claude log roots.
///
/// Honors `CLAUDE_CONFIG_DIR` (comma-separated), where each entry is either a
/// `projects` directory directly or has `projects` appended. Without the
/// override, both conventional fallback roots are returned.
fn claude_log_directory() -> Vec<PathBuf> {
    if let Ok(config_dir) = std::env::var("CLAUDE_CONFIG_DIR") {
        let roots: Vec<PathBuf> = config_dir
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| {
                let path = PathBuf::from(entry);
                if path.file_name().map(|n| n == "projects").unwrap_or(false) {
                    path
                } else {
                    path.join("projects")
                }
            })
            .collect();
        if !roots.is_empty() {
            return roots;
        }
    }

    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    vec![
        home.join(".claude").join("projects"),
        home.join(".config").join("claude").join("projects"),
    ]
}

/// Claude fetch plan.
fn claude_fetch_plan() -> FetchPlan {
    FetchPlan {
        source_modes: vec![SourceMode::OAuth, SourceMode::CLI, SourceMode::Web],
        build_pipeline: build_claude_pipeline,
    }
}

/// Builds the Claude fetch pipeline.
fn build_claude_pipeline(ctx: &FetchContext) -> FetchPipeline {
    let mut strategies: Vec<Box<dyn quotawatch_fetch::FetchStrategy>> = Vec::new();

    // OAuth strategy (highest priority)
    if ctx.settings.source_mode.allows_oauth() {
        strategies.push(Box::new(ClaudeOAuthStrategy::new()));
    }

    // CLI strategy (legacy)
    if ctx.settings.source_mode.allows_cli() {
        strategies.push(Box::new(ClaudeCliStrategy::new()));
    }

    // Web cookie strategy
    if ctx.settings.source_mode.allows_web() {
        strategies.push(Box::new(ClaudeWebStrategy::new()));
    }

    // PTY strategy (fallback)
    if ctx.settings.source_mode.allows_cli() {
        strategies.push(Box::new(ClaudePtyStrategy::new()));
    }

    FetchPipeline::with_strategies(strategies)
}

/// Claude CLI configuration.
fn claude_cli_config() -> CliConfig {
    CliConfig {
        name: "claude",
        aliases: &[],
        version_args: &["--version"],
        usage_args: &["usage"],
    }
}
