// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `QuotaWatch` Core
//!
//! Core types and errors shared across the provider acquisition pipeline.
//!
//! This crate provides the foundational abstractions used across all other
//! `QuotaWatch` crates:
//!
//! - Domain models (providers, usage windows, cost tracking)
//! - The crate-wide error enum used for data validation failures
//!
//! ## Key Types
//!
//! ### Provider Types
//! - [`ProviderKind`] - closed enum of the six supported providers
//! - [`ProviderIdentity`] - account identity (siloed per provider)
//! - [`ProviderMetadata`] - static per-provider window labels/CLI binding
//!
//! ### Usage Types
//! - [`UsageSnapshot`] - main container for usage data with rate windows
//! - [`RateWindow`] - a single rate-limit window (session, weekly, opus, ...)
//! - [`ProviderCostInfo`] - credit/cost info reported directly by a provider
//! - [`UsagePace`] - derived consumption pace relative to a reset window
//!
//! ### Cost Tracking
//! - [`CostUsageSnapshot`] - token cost tracking from local log scanning
//! - [`DailyCost`] - per-day usage/cost entry

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Cost tracking
    CostUsageSnapshot,
    DailyCost,
    FetchSource,
    LoginMethod,
    ModelSubtotal,
    PaceStage,
    // Usage types
    ProviderCostInfo,
    ProviderIdentity,
    // Provider types
    ProviderKind,
    ProviderMetadata,
    RateWindow,
    UsagePace,
    UsageSnapshot,
    UsageWindow,
};
