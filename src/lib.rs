//! Depscope - Decision-provenance engine for AI coding agent dependency adoption
//!
//! Depscope ingests chronological action logs produced by AI coding agents and
//! determines, for each dependency install, how the agent arrived at that
//! choice, whether the choice was risky, and whether the agent hand-rolled an
//! implementation instead of installing a package. The pipeline is a
//! deterministic batch transform: classification → decision-chain
//! reconstruction → risk scoring → build-vs-buy detection → aggregates.
//!
//! ## Modules
//!
//! - **Pattern Classifier**: Detect install actions and classify how each was discovered
//! - **Chain Builder**: Reconstruct the causal action sequence behind each install
//! - **Risk Scorer**: Composite per-install risk scores with explainable factors
//! - **Build-vs-Buy Detector**: Find custom implementations of packaged concerns

pub mod chains;
pub mod classifier;
pub mod custom_build;
pub mod error;
pub mod pipeline;
pub mod risk;
pub mod schema;
pub mod taxonomy;
pub mod types;

pub use chains::{chain_stats, ChainBuilder, ChainConfig};
pub use classifier::{InstallRuleSet, PatternClassifier};
pub use custom_build::BuildVsBuyDetector;
pub use error::AnalysisError;
pub use pipeline::{analyze_events, DepscopeAnalyzer};
pub use risk::{RiskConfig, RiskScorer};
pub use taxonomy::{CategoryEntry, CategoryTaxonomy, DetectorConfig};

// Schema exports
pub use schema::{ActionKind, AgentKind, RawEvent, SCHEMA_VERSION};

/// Depscope version embedded in all reports
pub const DEPSCOPE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "depscope";
