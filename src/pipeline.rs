//! Pipeline orchestration
//!
//! This module provides the public API for depscope. It partitions a flat
//! event stream into sessions and runs the full analysis: classification →
//! {chain building, risk scoring} → build-vs-buy detection → aggregates.

use crate::chains::{chain_stats, ChainBuilder, ChainConfig};
use crate::classifier::PatternClassifier;
use crate::custom_build::BuildVsBuyDetector;
use crate::error::AnalysisError;
use crate::risk::{RiskConfig, RiskScorer};
use crate::schema::RawEvent;
use crate::taxonomy::{CategoryTaxonomy, DetectorConfig};
use crate::types::{AnalysisReport, ReportProducer};
use log::debug;
use std::collections::HashMap;

/// Analyze an event stream with default configuration (stateless, one-shot).
///
/// # Arguments
/// * `events` - Normalized agent events, intra-session order preserved
///
/// # Returns
/// The complete analysis report
///
/// # Example
/// ```ignore
/// let report = analyze_events(&events)?;
/// ```
pub fn analyze_events(events: &[RawEvent]) -> Result<AnalysisReport, AnalysisError> {
    let analyzer = DepscopeAnalyzer::new()?;
    Ok(analyzer.analyze(events))
}

/// Analyzer with injected configuration tables.
///
/// All configuration is fixed at construction; `analyze` is a pure
/// transform over the supplied events.
pub struct DepscopeAnalyzer {
    classifier: PatternClassifier,
    chain_builder: ChainBuilder,
    scorer: RiskScorer,
    detector: BuildVsBuyDetector,
}

impl DepscopeAnalyzer {
    /// Create an analyzer with the built-in taxonomy and default weights.
    pub fn new() -> Result<Self, AnalysisError> {
        Self::with_config(
            CategoryTaxonomy::default(),
            DetectorConfig::builtin()?,
            ChainConfig::default(),
            RiskConfig::default(),
        )
    }

    /// Create an analyzer with explicit configuration tables.
    pub fn with_config(
        taxonomy: CategoryTaxonomy,
        detector_config: DetectorConfig,
        chain_config: ChainConfig,
        risk_config: RiskConfig,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            classifier: PatternClassifier::new(taxonomy.clone())?,
            chain_builder: ChainBuilder::new(chain_config),
            scorer: RiskScorer::new(risk_config, taxonomy.clone()),
            detector: BuildVsBuyDetector::new(detector_config, taxonomy)?,
        })
    }

    /// Run the full pipeline over a flat event stream.
    ///
    /// Events are partitioned by session in first-appearance order;
    /// intra-session arrival order is preserved. Each session is processed
    /// independently (classification never reads across sessions); the
    /// build-vs-buy pass and the aggregates run over the whole stream.
    pub fn analyze(&self, events: &[RawEvent]) -> AnalysisReport {
        let sessions = partition_sessions(events);
        debug!(
            "analyzing {} events across {} sessions",
            events.len(),
            sessions.len()
        );

        let mut classified = Vec::new();
        let mut chains = Vec::new();
        for (session_id, session_events) in &sessions {
            // Stage 1: Classify install events within the session
            let session_classified = self.classifier.classify(session_events);
            debug!(
                "session {}: {} installs",
                session_id,
                session_classified.len()
            );

            // Stage 2: Reconstruct decision chains
            chains.extend(
                self.chain_builder
                    .build_chains(session_events, &session_classified),
            );
            classified.extend(session_classified);
        }

        // Stage 3: Score risks across all classified installs
        let risks = self.scorer.score_risks(&classified);

        // Stage 4: Build-vs-buy detection over the full event stream
        let custom_builds = self.detector.detect(events);

        // Stage 5: Aggregate summaries
        let chain_stats = chain_stats(&chains);
        let risk_stats = self.scorer.risk_stats(&risks);
        let build_vs_buy = self.detector.summary(&custom_builds, &classified);

        AnalysisReport {
            producer: ReportProducer {
                name: crate::PRODUCER_NAME.to_string(),
                version: crate::DEPSCOPE_VERSION.to_string(),
            },
            classified,
            chains,
            risks,
            custom_builds,
            chain_stats,
            risk_stats,
            build_vs_buy,
        }
    }

    /// Encode a report to JSON for downstream reporting/sync collaborators.
    pub fn encode_to_json(&self, report: &AnalysisReport) -> Result<String, AnalysisError> {
        serde_json::to_string(report).map_err(AnalysisError::from)
    }
}

/// Group events by session, preserving first-appearance session order and
/// intra-session arrival order.
fn partition_sessions(events: &[RawEvent]) -> Vec<(String, Vec<RawEvent>)> {
    let mut order: Vec<String> = Vec::new();
    let mut by_session: HashMap<String, Vec<RawEvent>> = HashMap::new();
    for event in events {
        let bucket = by_session.entry(event.session_id.clone()).or_default();
        if bucket.is_empty() {
            order.push(event.session_id.clone());
        }
        bucket.push(event.clone());
    }
    order
        .into_iter()
        .filter_map(|session_id| {
            by_session
                .remove(&session_id)
                .map(|events| (session_id, events))
        })
        .collect()
}
