//! Risk scoring for classified installs
//!
//! Combines discovery classification, category sensitivity, abandonment,
//! and alternative-consideration into a composite per-install risk score.
//! Weights are fixed at construction and injected via `RiskConfig` so tests
//! can substitute their own tables.

use crate::taxonomy::CategoryTaxonomy;
use crate::types::{
    CategoryRisk, ClassifiedEvent, DiscoveryType, RiskAssessment, RiskFactor, RiskLevel, RiskStats,
};
use log::debug;
use std::collections::HashMap;

/// Fixed scoring weights
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Sensitivity weight per category name
    pub category_weights: HashMap<String, u32>,
    /// Weight for categorized packages not in the sensitivity table
    pub default_category_weight: u32,
    /// Weight for packages the taxonomy cannot categorize at all
    pub uncategorized_weight: u32,
    /// Added when the install was later abandoned
    pub abandonment_penalty: u32,
    /// Added when no alternatives were considered
    pub no_alternatives_penalty: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        let mut category_weights = HashMap::new();
        category_weights.insert("Authentication".to_string(), 30);
        category_weights.insert("Payments".to_string(), 30);
        category_weights.insert("Cryptography".to_string(), 25);
        category_weights.insert("Database".to_string(), 15);
        category_weights.insert("Realtime".to_string(), 10);
        Self {
            category_weights,
            default_category_weight: 5,
            uncategorized_weight: 10,
            abandonment_penalty: 15,
            no_alternatives_penalty: 10,
        }
    }
}

/// Weight of the discovery classification: the less verified the origin,
/// the higher the weight.
fn classification_weight(classification: DiscoveryType) -> u32 {
    match classification {
        DiscoveryType::Unknown => 40,
        DiscoveryType::TrainingRecall => 35,
        DiscoveryType::ReactiveSearch => 20,
        DiscoveryType::ContextInheritance => 15,
        DiscoveryType::ProactiveSearch => 10,
        DiscoveryType::UserDirected => 5,
    }
}

/// Map a composite score to a level: LOW < 34 <= MEDIUM < 67 <= HIGH.
fn level_for(score: u8) -> RiskLevel {
    match score {
        0..=33 => RiskLevel::Low,
        34..=66 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

/// Scores classified installs against the configured weight tables
pub struct RiskScorer {
    config: RiskConfig,
    taxonomy: CategoryTaxonomy,
}

impl RiskScorer {
    pub fn new(config: RiskConfig, taxonomy: CategoryTaxonomy) -> Self {
        Self { config, taxonomy }
    }

    /// Score every classified install. Output order matches input order.
    pub fn score_risks(&self, classified: &[ClassifiedEvent]) -> Vec<RiskAssessment> {
        classified.iter().map(|event| self.score(event)).collect()
    }

    fn score(&self, classified: &ClassifiedEvent) -> RiskAssessment {
        let mut factors = Vec::new();
        let mut score = classification_weight(classified.classification);
        if matches!(
            classified.classification,
            DiscoveryType::TrainingRecall | DiscoveryType::Unknown
        ) {
            factors.push(RiskFactor::UnverifiedOrigin);
        }

        let category = classified
            .package_name
            .as_deref()
            .and_then(|name| self.taxonomy.categorize(name));
        let category_weight = match category {
            Some(name) => match self.config.category_weights.get(name) {
                Some(&weight) => {
                    if weight > self.config.default_category_weight {
                        factors.push(RiskFactor::SensitiveCategory);
                    }
                    weight
                }
                None => self.config.default_category_weight,
            },
            None => self.config.uncategorized_weight,
        };
        score += category_weight;

        if classified.abandoned {
            factors.push(RiskFactor::Abandoned);
            score += self.config.abandonment_penalty;
        }
        if classified.alternatives.is_empty() {
            factors.push(RiskFactor::NoAlternatives);
            score += self.config.no_alternatives_penalty;
        }

        let score = score.min(100) as u8;
        let level = level_for(score);

        debug!(
            "risk for {}: score {} ({})",
            classified.package_name.as_deref().unwrap_or("?"),
            score,
            level.as_str()
        );

        RiskAssessment {
            event: classified.clone(),
            score,
            level,
            factors,
        }
    }

    /// Aggregate counts per level and the highest-risk categories by mean
    /// score (descending; ties broken by name for determinism).
    pub fn risk_stats(&self, assessments: &[RiskAssessment]) -> RiskStats {
        let mut low = 0;
        let mut medium = 0;
        let mut high = 0;
        let mut per_category: HashMap<String, (u32, usize)> = HashMap::new();

        for assessment in assessments {
            match assessment.level {
                RiskLevel::Low => low += 1,
                RiskLevel::Medium => medium += 1,
                RiskLevel::High => high += 1,
            }
            let category = assessment
                .event
                .package_name
                .as_deref()
                .and_then(|name| self.taxonomy.categorize(name))
                .unwrap_or("Uncategorized");
            let entry = per_category.entry(category.to_string()).or_insert((0, 0));
            entry.0 += assessment.score as u32;
            entry.1 += 1;
        }

        let mut top_categories: Vec<CategoryRisk> = per_category
            .into_iter()
            .map(|(category, (total, count))| CategoryRisk {
                category,
                mean_score: total as f64 / count as f64,
                install_count: count,
            })
            .collect();
        top_categories.sort_by(|a, b| {
            b.mean_score
                .partial_cmp(&a.mean_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
        });

        RiskStats {
            low,
            medium,
            high,
            top_categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ActionKind, AgentKind, RawEvent};
    use crate::types::PackageManager;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn make_classified(
        package: &str,
        classification: DiscoveryType,
        abandoned: bool,
        alternatives: Vec<String>,
    ) -> ClassifiedEvent {
        ClassifiedEvent {
            event: RawEvent {
                id: Uuid::new_v4(),
                session_id: "session-1".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                agent: AgentKind::ClaudeCode,
                action: ActionKind::Bash,
                raw: format!("npm install {package}"),
                result: None,
                exit_code: Some(0),
                cwd: None,
            },
            is_install: true,
            package_name: Some(package.to_string()),
            package_manager: Some(PackageManager::Npm),
            classification,
            confidence: 60,
            abandoned,
            alternatives,
        }
    }

    fn scorer() -> RiskScorer {
        RiskScorer::new(RiskConfig::default(), CategoryTaxonomy::default())
    }

    #[test]
    fn test_unverified_sensitive_install_is_high_risk() {
        let classified =
            make_classified("jsonwebtoken", DiscoveryType::TrainingRecall, false, vec![]);
        let assessment = &scorer().score_risks(&[classified])[0];

        // 35 classification + 30 category + 10 no alternatives
        assert_eq!(assessment.score, 75);
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(assessment.factors.contains(&RiskFactor::UnverifiedOrigin));
        assert!(assessment.factors.contains(&RiskFactor::SensitiveCategory));
        assert!(assessment.factors.contains(&RiskFactor::NoAlternatives));
        assert!(!assessment.factors.contains(&RiskFactor::Abandoned));
    }

    #[test]
    fn test_directed_css_tooling_is_low_risk() {
        let classified = make_classified(
            "tailwindcss",
            DiscoveryType::UserDirected,
            false,
            vec!["sass".to_string()],
        );
        let assessment = &scorer().score_risks(&[classified])[0];

        // 5 classification + 5 default category, no penalties
        assert_eq!(assessment.score, 10);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_abandonment_penalty() {
        let kept = make_classified("stripe", DiscoveryType::ProactiveSearch, false, vec![
            "braintree".to_string(),
        ]);
        let abandoned = make_classified("stripe", DiscoveryType::ProactiveSearch, true, vec![
            "braintree".to_string(),
        ]);
        let scorer = scorer();
        let kept_score = scorer.score_risks(&[kept])[0].score;
        let abandoned_score = scorer.score_risks(&[abandoned])[0].score;
        assert_eq!(abandoned_score - kept_score, 15);
    }

    #[test]
    fn test_uncategorized_package_weight() {
        let classified = make_classified(
            "totally-unknown-pkg-xyz-qqq",
            DiscoveryType::UserDirected,
            false,
            vec![],
        );
        let assessment = &scorer().score_risks(&[classified])[0];
        // 5 classification + 10 uncategorized + 10 no alternatives
        assert_eq!(assessment.score, 25);
        assert!(!assessment.factors.contains(&RiskFactor::SensitiveCategory));
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for(0), RiskLevel::Low);
        assert_eq!(level_for(33), RiskLevel::Low);
        assert_eq!(level_for(34), RiskLevel::Medium);
        assert_eq!(level_for(66), RiskLevel::Medium);
        assert_eq!(level_for(67), RiskLevel::High);
        assert_eq!(level_for(100), RiskLevel::High);
    }

    #[test]
    fn test_risk_stats_ranks_categories() {
        let scorer = scorer();
        let assessments = scorer.score_risks(&[
            make_classified("jsonwebtoken", DiscoveryType::Unknown, false, vec![]),
            make_classified("bcrypt", DiscoveryType::TrainingRecall, false, vec![]),
            make_classified("tailwindcss", DiscoveryType::UserDirected, false, vec![]),
        ]);
        let stats = scorer.risk_stats(&assessments);

        assert_eq!(stats.high, 2);
        assert_eq!(stats.low, 1);
        assert_eq!(stats.medium, 0);
        assert_eq!(stats.top_categories[0].category, "Authentication");
        assert_eq!(stats.top_categories[0].install_count, 2);
        assert!(stats.top_categories[0].mean_score > stats.top_categories[1].mean_score);
    }
}
