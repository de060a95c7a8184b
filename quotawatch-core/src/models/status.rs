//! Fetch-source type: how a snapshot was obtained.

use serde::{Deserialize, Serialize};

/// How the usage data was fetched. Mirrors the strategy kinds a provider
/// can expose (see `quotawatch_fetch::FetchKind`) plus `Auto` for callers
/// that don't pin a particular source mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    /// Automatically determined best method.
    #[default]
    Auto,
    /// Via CLI tool (PTY-driven or subprocess).
    CLI,
    /// Via web scraping / browser cookie import.
    Web,
    /// Via OAuth token.
    OAuth,
    /// Via API key.
    Api,
}

impl FetchSource {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::CLI => "CLI",
            Self::Web => "Web",
            Self::OAuth => "OAuth",
            Self::Api => "API",
        }
    }

    /// Returns all fetch sources.
    pub fn all() -> &'static [FetchSource] {
        &[Self::Auto, Self::CLI, Self::Web, Self::OAuth, Self::Api]
    }
}

impl std::fmt::Display for FetchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_source_display() {
        assert_eq!(FetchSource::CLI.to_string(), "CLI");
        assert_eq!(FetchSource::OAuth.to_string(), "OAuth");
    }
}
