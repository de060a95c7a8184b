// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # QuotaWatch Providers
//!
//! Provider-specific implementations for the QuotaWatch application.
//!
//! This crate contains the concrete implementations for each supported
//! LLM coding assistant. Each provider module includes:
//!
//! - **Descriptor**: Static configuration (metadata, fetch plan)
//! - **Strategies**: Fetch strategy implementations (CLI, OAuth, Web)
//! - **Parser**: Response parsing for various formats
//!
//! ## Supported Providers (6 total)
//!
//! | Provider | CLI | OAuth | API Key | Web |
//! |----------|-----|-------|---------|-----|
//! | Codex (OpenAI) | ✅ | ✅ | ❌ | ❌ |
//! | Claude (Anthropic) | ✅ | ✅ | ❌ | ✅ |
//! | Cursor | ❌ | ❌ | ❌ | ✅ |
//! | Copilot (GitHub) | ❌ | ✅ | ✅ | ❌ |
//! | Gemini (Google) | ✅ | ✅ | ❌ | ❌ |
//! | Antigravity | ❌ | ❌ | ❌ | ✅ |
//!
//! ## Usage
//!
//! ```ignore
//! use quotawatch_providers::ProviderRegistry;
//! use quotawatch_core::ProviderKind;
//! use quotawatch_fetch::FetchContext;
//!
//! // Get a provider by kind
//! let desc = ProviderRegistry::get(ProviderKind::Claude).unwrap();
//!
//! // Build and execute the fetch pipeline
//! let ctx = FetchContext::new();
//! let pipeline = desc.build_pipeline(&ctx);
//! let outcome = pipeline.execute(&ctx).await;
//! ```

pub mod descriptor;
pub mod registry;
pub mod service;

// Provider modules (alphabetical)
pub mod antigravity;
pub mod claude;
pub mod codex;
pub mod copilot;
pub mod cursor;
pub mod gemini;

pub mod cost;

// Re-export key types
pub use descriptor::{
    CliConfig, FetchPlan, ProviderDescriptor, ProviderDescriptorBuilder, TokenCostConfig,
};
pub use registry::ProviderRegistry;
pub use service::{CachedFetch, ProviderService};
pub use cost::{CostLogFormat, CostScanError, CostScanner};

// Re-export provider descriptors
pub use antigravity::antigravity_descriptor;
pub use claude::claude_descriptor;
pub use codex::codex_descriptor;
pub use copilot::copilot_descriptor;
pub use cursor::cursor_descriptor;
pub use gemini::gemini_descriptor;

// Re-export strategy types for convenience
pub use antigravity::AntigravityLocalStrategy;
pub use claude::{ClaudeCliStrategy, ClaudeOAuthStrategy, ClaudeWebStrategy};
pub use codex::CodexOAuthStrategy;
pub use copilot::{CopilotApiStrategy, CopilotEnvStrategy};
pub use cursor::{CursorLocalStrategy, CursorWebStrategy};
pub use gemini::{GeminiCliStrategy, GeminiOAuthStrategy};

#[cfg(test)]
mod parser_edge_tests;
