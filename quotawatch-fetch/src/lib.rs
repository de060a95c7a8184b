// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # QuotaWatch Fetch
//!
//! HTTP fetching strategies and host APIs for the QuotaWatch application.
//!
//! This crate provides the infrastructure for fetching usage data from
//! various LLM providers. It includes:
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::keychain`] - Secure credential storage (system keychain)
//! - [`host::http`] - HTTP client with tracing and domain allowlist
//! - [`host::process`] - Subprocess execution for CLI tools
//! - [`host::pty`] - PTY-based execution for interactive CLI tools
//! - [`host::browser`] - Browser cookie import for web scraping
//!
//! ## Fetch Pipeline
//!
//! The fetch pipeline executes multiple strategies in priority order:
//!
//! - [`strategy::FetchStrategy`] - Trait for fetch implementations
//! - [`pipeline::FetchPipeline`] - Executes strategies in order
//! - [`context::FetchContext`] - Provides access to host APIs
//!
//! ## Example
//!
//! ```ignore
//! use quotawatch_fetch::{FetchContext, FetchPipeline};
//!
//! // Create a fetch context with default settings
//! let ctx = FetchContext::new();
//!
//! // Create a pipeline with provider strategies
//! let pipeline = FetchPipeline::with_strategies(vec![
//!     Box::new(ClaudeCliStrategy::new()),
//!     Box::new(ClaudeOAuthStrategy::new()),
//! ]);
//!
//! // Execute and get the result
//! let outcome = pipeline.execute(&ctx).await;
//! ```

// Core modules
pub mod context;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod strategy;

// Re-export key types at crate root

// Errors
pub use error::{BrowserError, FetchError, HttpError, KeychainError, ProcessError, PtyError};

// Host APIs
pub use host::{
    browser::{Browser, BrowserCookieImporter, CookieRecord},
    http::HttpClient,
    keychain::{KeychainApi, SystemKeychain},
    process::{ProcessOutput, ProcessRunner},
};

// Strategy & Pipeline
pub use context::{FetchContext, FetchContextBuilder, FetchSettings, RuntimeMode, SourceMode};
pub use pipeline::{FetchAttempt, FetchOutcome, FetchPipeline};
pub use strategy::{FetchKind, FetchResult, FetchStrategy, StrategyInfo};
