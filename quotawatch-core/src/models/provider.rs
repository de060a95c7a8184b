//! Provider-related types.
//!
//! This module contains types related to AI coding assistant providers:
//! - [`ProviderKind`] - closed enum of supported providers
//! - [`ProviderIdentity`] - account identity (siloed per provider)
//! - [`ProviderMetadata`] - provider capabilities and display info

use serde::{Deserialize, Serialize};

// ============================================================================
// Provider Kind
// ============================================================================

/// Supported AI coding assistant provider kinds.
///
/// This is a closed set - every strategy, descriptor, and scanner in the
/// pipeline is keyed off one of these six variants. Adding a provider means
/// adding a variant here plus the corresponding strategy set in
/// `quotawatch-providers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Claude.
    Claude,
    /// OpenAI Codex / ChatGPT.
    Codex,
    /// Cursor IDE.
    Cursor,
    /// Google Gemini.
    Gemini,
    /// GitHub Copilot.
    Copilot,
    /// Google Antigravity.
    Antigravity,
}

impl ProviderKind {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Codex => "Codex",
            Self::Cursor => "Cursor",
            Self::Gemini => "Gemini",
            Self::Copilot => "Copilot",
            Self::Antigravity => "Antigravity",
        }
    }

    /// Returns all available provider kinds.
    pub fn all() -> &'static [ProviderKind] {
        &[
            Self::Claude,
            Self::Codex,
            Self::Cursor,
            Self::Gemini,
            Self::Copilot,
            Self::Antigravity,
        ]
    }

    /// Returns the stable lowercase string identifier for this provider.
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Cursor => "cursor",
            Self::Gemini => "gemini",
            Self::Copilot => "copilot",
            Self::Antigravity => "antigravity",
        }
    }

    /// Converts this provider to an index (position in the `all()` array).
    pub fn to_index(self) -> usize {
        Self::all().iter().position(|&p| p == self).unwrap_or(0)
    }

    /// Creates a provider from an index (position in the `all()` array).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.cli_name() == s)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cli_name())
    }
}

// ============================================================================
// Provider Identity
// ============================================================================

/// Account identity information for a provider.
///
/// **Important**: this is siloed per provider - never mix identity from
/// different providers. Each provider has its own authentication context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// The provider this identity belongs to.
    pub provider_id: ProviderKind,
    /// Account email address.
    pub account_email: Option<String>,
    /// Organization name (if applicable).
    pub account_organization: Option<String>,
    /// Plan/subscription name.
    pub plan_name: Option<String>,
    /// How the user authenticated.
    pub login_method: Option<LoginMethod>,
}

impl ProviderIdentity {
    /// Creates a new identity for the given provider.
    pub fn new(provider_id: ProviderKind) -> Self {
        Self {
            provider_id,
            account_email: None,
            account_organization: None,
            plan_name: None,
            login_method: None,
        }
    }

    /// Returns a display string for this identity.
    pub fn display_string(&self) -> String {
        match (&self.account_email, &self.account_organization) {
            (Some(email), Some(org)) => format!("{} ({})", email, org),
            (Some(email), None) => email.clone(),
            (None, Some(org)) => org.clone(),
            (None, None) => self.provider_id.display_name().to_string(),
        }
    }
}

/// How the user authenticated with a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// OAuth 2.0 flow.
    OAuth,
    /// API key authentication.
    #[default]
    ApiKey,
    /// Browser cookies (scraped from browser).
    BrowserCookies,
    /// CLI tool authentication.
    CLI,
    /// Device flow (OAuth device authorization).
    DeviceFlow,
}

// ============================================================================
// Provider Metadata
// ============================================================================

/// Static metadata describing a provider's window labels and CLI binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// The provider this metadata describes.
    pub id: ProviderKind,
    /// Display name in UI.
    pub display_name: String,
    /// Label for the primary window (e.g., "Session", "5-hour").
    pub primary_label: String,
    /// Label for the secondary window (e.g., "Weekly", "Monthly").
    pub secondary_label: String,
    /// Label for the tertiary window (e.g., "Opus" for Claude).
    pub tertiary_label: Option<String>,
    /// Whether this provider exposes a tertiary window.
    pub supports_tertiary: bool,
    /// Whether this provider reports credit/cost info.
    pub supports_credits: bool,
    /// CLI binary name.
    pub cli_name: String,
    /// Whether enabled by default.
    pub default_enabled: bool,
    /// Whether this is considered a primary provider.
    pub is_primary_provider: bool,
}

impl ProviderMetadata {
    /// Creates default metadata for a provider kind.
    pub fn for_provider(kind: ProviderKind) -> Self {
        let name = kind.display_name();
        Self {
            id: kind,
            display_name: name.to_string(),
            primary_label: "Session".to_string(),
            secondary_label: "Weekly".to_string(),
            tertiary_label: None,
            supports_tertiary: false,
            supports_credits: false,
            cli_name: kind.cli_name().to_string(),
            default_enabled: true,
            is_primary_provider: false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_display_name() {
        assert_eq!(ProviderKind::Claude.display_name(), "Claude");
        assert_eq!(ProviderKind::Antigravity.display_name(), "Antigravity");
    }

    #[test]
    fn test_provider_kind_cli_name_is_stable_lowercase() {
        for kind in ProviderKind::all() {
            assert_eq!(kind.cli_name(), kind.cli_name().to_lowercase());
        }
    }

    #[test]
    fn test_provider_kind_all_has_six_entries() {
        assert_eq!(ProviderKind::all().len(), 6);
    }

    #[test]
    fn test_provider_kind_round_trips_through_index() {
        for kind in ProviderKind::all() {
            assert_eq!(ProviderKind::from_index(kind.to_index()), Some(*kind));
        }
    }

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Claude);
        assert!("nonsense".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_identity_display_string() {
        let mut identity = ProviderIdentity::new(ProviderKind::Claude);
        identity.account_email = Some("test@example.com".to_string());
        identity.account_organization = Some("Acme Inc".to_string());

        assert_eq!(identity.display_string(), "test@example.com (Acme Inc)");
    }
}
