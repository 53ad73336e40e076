//! Core types for the depscope pipeline
//!
//! This module defines the data structures that flow through each stage of
//! the pipeline: classified install events, decision chains, risk
//! assessments, custom-build detections, and their aggregate summaries.

use crate::schema::RawEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Package manager that executed an install command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
    Pip,
    Cargo,
    Go,
    Gem,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
            PackageManager::Pip => "pip",
            PackageManager::Cargo => "cargo",
            PackageManager::Go => "go",
            PackageManager::Gem => "gem",
        }
    }
}

/// How the agent arrived at a dependency choice.
///
/// Exactly one value per install event; rule priority is fixed and
/// documented on the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryType {
    /// The user explicitly told the agent which package to use
    UserDirected,
    /// The agent compared multiple candidates before choosing
    ProactiveSearch,
    /// The agent searched in reaction to a failure
    ReactiveSearch,
    /// The package was already present in project context the agent read
    ContextInheritance,
    /// The agent installed from memory with no observable evidence
    TrainingRecall,
    /// Evidence present but no rule satisfied
    Unknown,
}

impl DiscoveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryType::UserDirected => "user_directed",
            DiscoveryType::ProactiveSearch => "proactive_search",
            DiscoveryType::ReactiveSearch => "reactive_search",
            DiscoveryType::ContextInheritance => "context_inheritance",
            DiscoveryType::TrainingRecall => "training_recall",
            DiscoveryType::Unknown => "unknown",
        }
    }
}

/// An install-bearing event with its discovery classification.
///
/// Created once by the classifier and never mutated; chain and risk stages
/// read it only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    /// The originating raw event
    pub event: RawEvent,
    /// Always true on emitted values; kept for downstream filtering
    pub is_install: bool,
    /// Package name with version suffix stripped (npm scope preserved)
    pub package_name: Option<String>,
    /// Package manager that ran the install
    pub package_manager: Option<PackageManager>,
    /// Discovery-type classification
    pub classification: DiscoveryType,
    /// Confidence in the classification (0-100)
    pub confidence: u8,
    /// Whether the package was later removed or replaced in-session
    pub abandoned: bool,
    /// Same-category candidates considered before the final choice,
    /// in first-appearance order; empty means no comparison happened
    pub alternatives: Vec<String>,
}

/// Descriptive label for the dominant shape of a decision chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    /// Install with no preceding related activity
    Direct,
    /// A failure followed by search activity
    FailureRecovery,
    /// Multiple searches comparing candidates
    Comparison,
    /// Reads of project files without searching
    ContextGathering,
    /// Related activity with no single dominant kind
    Mixed,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Direct => "direct",
            ChainType::FailureRecovery => "failure_recovery",
            ChainType::Comparison => "comparison",
            ChainType::ContextGathering => "context_gathering",
            ChainType::Mixed => "mixed",
        }
    }
}

/// The ordered sequence of actions causally leading to an install.
///
/// Scoped to a single session; never spans sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionChain {
    /// The install this chain leads to
    pub install: ClassifiedEvent,
    /// Preceding causally-related events, in chronological order
    pub events: Vec<RawEvent>,
    /// Dominant shape of the chain
    pub chain_type: ChainType,
    /// Elapsed time from first chain event to the install (ms)
    pub duration_ms: i64,
}

/// Aggregate statistics over a set of decision chains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStats {
    /// Number of chains
    pub chain_count: usize,
    /// Mean chain length (events including the install)
    pub mean_length: f64,
    /// Median chain length
    pub median_length: f64,
    /// Count of chains per chain type (ordered for stable serialization)
    pub type_distribution: BTreeMap<String, usize>,
    /// Median elapsed time from first chain event to install (ms)
    pub median_lead_time_ms: i64,
}

/// Risk level derived from the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Signal that contributed to a risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    /// Install with no verifiable discovery evidence
    UnverifiedOrigin,
    /// Package belongs to a sensitive category
    SensitiveCategory,
    /// Package was later removed or replaced
    Abandoned,
    /// No alternatives were considered
    NoAlternatives,
}

impl RiskFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::UnverifiedOrigin => "unverified_origin",
            RiskFactor::SensitiveCategory => "sensitive_category",
            RiskFactor::Abandoned => "abandoned",
            RiskFactor::NoAlternatives => "no_alternatives",
        }
    }
}

/// Per-install risk assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// The assessed install event
    pub event: ClassifiedEvent,
    /// Composite risk score (0-100)
    pub score: u8,
    /// Score mapped to a level
    pub level: RiskLevel,
    /// Signals that fired, for explainability
    pub factors: Vec<RiskFactor>,
}

/// Aggregate statistics over a set of risk assessments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskStats {
    /// Number of low-risk installs
    pub low: usize,
    /// Number of medium-risk installs
    pub medium: usize,
    /// Number of high-risk installs
    pub high: usize,
    /// Categories ranked by mean risk score, descending
    pub top_categories: Vec<CategoryRisk>,
}

/// Mean risk score for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRisk {
    pub category: String,
    pub mean_score: f64,
    pub install_count: usize,
}

/// Evidence of a hand-rolled implementation of a packaged concern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomBuildEvent {
    /// The file-write event containing the evidence
    pub event: RawEvent,
    /// Category the implementation belongs to
    pub category: String,
    /// Domain keywords found, in match order
    pub matched_keywords: Vec<String>,
    /// Detection confidence (0-100)
    pub confidence: u8,
}

/// Per-category install vs. custom-build counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAdoption {
    pub category: String,
    pub install_count: usize,
    pub custom_build_count: usize,
    /// custom builds / (installs + custom builds), percent, 2 decimals
    pub custom_build_pct: f64,
}

/// Producer metadata stamped into every report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
}

/// Complete analysis output, consumed by reporting/persistence/sync
/// collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub producer: ReportProducer,
    pub classified: Vec<ClassifiedEvent>,
    pub chains: Vec<DecisionChain>,
    pub risks: Vec<RiskAssessment>,
    pub custom_builds: Vec<CustomBuildEvent>,
    pub chain_stats: ChainStats,
    pub risk_stats: RiskStats,
    pub build_vs_buy: Vec<CategoryAdoption>,
}
