//! Cost command - show local token cost report.
//!
//! Scans local log files for token usage and calculates costs.

use anyhow::Result;
use clap::Args;
use quotawatch_core::{CostUsageSnapshot, ProviderKind};
use quotawatch_providers::{CostScanner, ProviderRegistry};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the cost command.
#[derive(Args)]
pub struct CostArgs {
    /// Provider for cost report.
    #[arg(long, short, default_value = "all")]
    pub provider: String,

    /// Refresh (re-scan logs, ignore cache).
    #[arg(long)]
    pub refresh: bool,

    /// Show daily breakdown.
    #[arg(long)]
    pub daily: bool,
}

/// Runs the cost command.
pub async fn run(args: &CostArgs, cli: &Cli) -> Result<()> {
    info!(provider = %args.provider, refresh = args.refresh, "Running cost report");

    let providers = parse_cost_providers(&args.provider)?;
    let mut results: HashMap<ProviderKind, CostUsageSnapshot> = HashMap::new();

    for provider in providers {
        let Some(scanner) = CostScanner::for_provider(provider) else {
            debug!(provider = ?provider, "no cost scanner for provider");
            continue;
        };

        match scanner.scan(args.refresh) {
            Ok(snapshot) => {
                results.insert(provider, snapshot);
            }
            Err(e) => {
                debug!(provider = ?provider, error = %e, "cost scan failed");
            }
        }
    }

    output_cost_results(&results, cli)?;

    Ok(())
}

/// Parses provider selection for cost command.
fn parse_cost_providers(arg: &str) -> Result<Vec<ProviderKind>> {
    match arg.to_lowercase().as_str() {
        "all" => Ok(ProviderRegistry::all()
            .iter()
            .filter(|d| d.token_cost.supports_token_cost)
            .map(|d| d.id)
            .collect()),
        name => {
            if let Some(desc) = ProviderRegistry::get_by_cli_name(name) {
                if desc.token_cost.supports_token_cost {
                    Ok(vec![desc.id])
                } else {
                    anyhow::bail!("Provider {} does not support token cost tracking", name);
                }
            } else {
                anyhow::bail!("Unknown provider: {}", name);
            }
        }
    }
}

/// Outputs cost results.
fn output_cost_results(results: &HashMap<ProviderKind, CostUsageSnapshot>, cli: &Cli) -> Result<()> {
    if results.is_empty() {
        println!("No token cost data available.");
        println!();
        println!("Token cost tracking requires log files. Supported providers:");

        for desc in ProviderRegistry::all() {
            if desc.token_cost.supports_token_cost {
                println!("  • {} ({})", desc.display_name(), desc.cli_name());
            }
        }

        return Ok(());
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            let mut first = true;
            for (provider, snapshot) in results {
                if !first {
                    println!();
                }
                first = false;

                let desc = ProviderRegistry::get(*provider);
                let output = formatter.format_cost(snapshot, desc);
                println!("{}", output);
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = formatter.format_cost_results(results)?;
            println!("{}", output);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cost_providers_all() {
        let providers = parse_cost_providers("all").unwrap();
        assert!(!providers.is_empty());
        assert!(providers.contains(&ProviderKind::Claude));
        assert!(providers.contains(&ProviderKind::Codex));
    }

    #[test]
    fn test_parse_cost_providers_unsupported() {
        let result = parse_cost_providers("cursor");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_cost_providers_unknown() {
        let result = parse_cost_providers("nonexistent");
        assert!(result.is_err());
    }
}
