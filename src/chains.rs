//! Decision-chain reconstruction
//!
//! For each install event this module walks backward through the session,
//! collecting the contiguous run of causally plausible predecessor actions
//! (searches, reads, failures) that led to the install, and labels the
//! resulting chain by its dominant shape.

use crate::schema::{ActionKind, RawEvent};
use crate::types::{ChainStats, ChainType, ClassifiedEvent, DecisionChain};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Default maximum gap between consecutive chain events (10 minutes)
pub const DEFAULT_MAX_GAP_MS: i64 = 600_000;

/// Default maximum number of predecessor events per chain
pub const DEFAULT_MAX_EVENTS: usize = 50;

/// Bounds for backward traversal.
///
/// Both limits exist so degenerate sessions (very long, gapless) cannot
/// produce unbounded chains.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// A larger gap than this between consecutive events breaks causal
    /// continuity (ms)
    pub max_gap_ms: i64,
    /// Maximum predecessor events collected per chain
    pub max_events: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_gap_ms: DEFAULT_MAX_GAP_MS,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

/// Builds decision chains for classified install events
pub struct ChainBuilder {
    config: ChainConfig,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl ChainBuilder {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    /// Reconstruct one chain per install event.
    ///
    /// `session_events` must be the time-ordered event list of a single
    /// session; `classified` the classifier output for that same session.
    pub fn build_chains(
        &self,
        session_events: &[RawEvent],
        classified: &[ClassifiedEvent],
    ) -> Vec<DecisionChain> {
        let install_ids: HashSet<Uuid> = classified.iter().map(|c| c.event.id).collect();
        let mut chains = Vec::with_capacity(classified.len());

        for install in classified {
            let Some(install_idx) = session_events
                .iter()
                .position(|e| e.id == install.event.id)
            else {
                continue;
            };

            let run = self.collect_run(session_events, install_idx, &install_ids);
            let chain_type = label_chain(&run);
            let duration_ms = run
                .first()
                .map(|first| {
                    install
                        .event
                        .timestamp
                        .signed_duration_since(first.timestamp)
                        .num_milliseconds()
                })
                .unwrap_or(0);

            debug!(
                "chain for {} ({} predecessors, {})",
                install.package_name.as_deref().unwrap_or("?"),
                run.len(),
                chain_type.as_str()
            );

            chains.push(DecisionChain {
                install: install.clone(),
                events: run,
                chain_type,
                duration_ms,
            });
        }
        chains
    }

    /// Walk backward from the install, stopping at a prior install event,
    /// the session start, a non-plausible event, a time gap larger than the
    /// configured maximum, or the event-count bound. The collected run is
    /// returned in chronological order.
    fn collect_run(
        &self,
        session_events: &[RawEvent],
        install_idx: usize,
        install_ids: &HashSet<Uuid>,
    ) -> Vec<RawEvent> {
        let mut run: Vec<RawEvent> = Vec::new();
        let mut next_timestamp = session_events[install_idx].timestamp;

        for event in session_events[..install_idx].iter().rev() {
            if run.len() >= self.config.max_events {
                break;
            }
            if install_ids.contains(&event.id) {
                break;
            }
            if !is_plausible(event) {
                break;
            }
            let gap_ms = next_timestamp
                .signed_duration_since(event.timestamp)
                .num_milliseconds();
            if gap_ms > self.config.max_gap_ms {
                break;
            }
            next_timestamp = event.timestamp;
            run.push(event.clone());
        }

        run.reverse();
        run
    }
}

/// Causally plausible chain members: searches, reads, and failures.
fn is_plausible(event: &RawEvent) -> bool {
    matches!(event.action, ActionKind::Search | ActionKind::Read) || event.is_failure()
}

/// Label a chain by the dominant kinds in its predecessor run.
fn label_chain(run: &[RawEvent]) -> ChainType {
    if run.is_empty() {
        return ChainType::Direct;
    }
    let searches = run
        .iter()
        .filter(|e| e.action == ActionKind::Search)
        .count();
    let reads = run.iter().filter(|e| e.action == ActionKind::Read).count();
    let failures = run.iter().filter(|e| e.is_failure()).count();

    if failures > 0 && searches > 0 {
        ChainType::FailureRecovery
    } else if searches >= 2 {
        ChainType::Comparison
    } else if reads > 0 && searches == 0 {
        ChainType::ContextGathering
    } else {
        ChainType::Mixed
    }
}

/// Aggregate statistics over a set of chains: mean/median chain length
/// (events including the install), chain-type distribution, and the median
/// elapsed time from first chain event to install.
pub fn chain_stats(chains: &[DecisionChain]) -> ChainStats {
    let mut lengths: Vec<usize> = chains.iter().map(|c| c.events.len() + 1).collect();
    lengths.sort_unstable();

    let mut lead_times: Vec<i64> = chains.iter().map(|c| c.duration_ms).collect();
    lead_times.sort_unstable();

    let mut type_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for chain in chains {
        *type_distribution
            .entry(chain.chain_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    let mean_length = if lengths.is_empty() {
        0.0
    } else {
        lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
    };

    ChainStats {
        chain_count: chains.len(),
        mean_length,
        median_length: median_usize(&lengths),
        type_distribution,
        median_lead_time_ms: median_i64(&lead_times),
    }
}

fn median_usize(sorted: &[usize]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

fn median_i64(sorted: &[i64]) -> i64 {
    match sorted.len() {
        0 => 0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2,
    }
}
