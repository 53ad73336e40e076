//! Build-vs-buy detection
//!
//! Scans file-write actions for evidence that the agent hand-rolled an
//! implementation of a concern normally satisfied by a package. Categories
//! already covered by an install in the same event set are suppressed to
//! avoid flagging glue code around a real dependency.

use crate::classifier::InstallRuleSet;
use crate::error::AnalysisError;
use crate::schema::{ActionKind, RawEvent};
use crate::taxonomy::{CategoryTaxonomy, DetectorConfig};
use crate::types::{CategoryAdoption, ClassifiedEvent, CustomBuildEvent};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Confidence assigned on a path-pattern match
const PATH_MATCH_CONFIDENCE: u32 = 60;

/// Base confidence for a keyword-only detection
const KEYWORD_BASE_CONFIDENCE: u32 = 40;

/// Confidence added per matched keyword
const KEYWORD_STEP: u32 = 10;

/// Confidence ceiling for any detection
const MAX_CONFIDENCE: u32 = 95;

/// Minimum keyword matches required to emit a keyword detection
const MIN_KEYWORD_MATCHES: usize = 2;

/// Detects custom implementations of packaged concerns
pub struct BuildVsBuyDetector {
    config: DetectorConfig,
    taxonomy: CategoryTaxonomy,
    rules: InstallRuleSet,
}

impl BuildVsBuyDetector {
    pub fn new(
        config: DetectorConfig,
        taxonomy: CategoryTaxonomy,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            config,
            taxonomy,
            rules: InstallRuleSet::new()?,
        })
    }

    /// Scan an event set for custom implementations.
    ///
    /// Pass 1 collects the categories already satisfied by an install
    /// (independent of classifier output); pass 2 examines each remaining
    /// `file_write` for path-pattern and content-keyword evidence.
    pub fn detect(&self, events: &[RawEvent]) -> Vec<CustomBuildEvent> {
        let suppressed = self.installed_categories(events);
        let mut detections = Vec::new();

        for event in events {
            if event.action != ActionKind::FileWrite {
                continue;
            }
            let path = &event.raw;
            let content_lower = event
                .result
                .as_deref()
                .unwrap_or("")
                .to_lowercase();

            for rule in self.config.rules() {
                if suppressed.contains(&rule.category) {
                    continue;
                }

                // Path evidence: one detection per category per event
                let mut detection: Option<CustomBuildEvent> = None;
                if rule.path_pattern.is_match(path) {
                    detection = Some(CustomBuildEvent {
                        event: event.clone(),
                        category: rule.category.clone(),
                        matched_keywords: Vec::new(),
                        confidence: PATH_MATCH_CONFIDENCE as u8,
                    });
                }

                // Content evidence: merge into the path detection if one
                // exists, otherwise emit standalone
                let matched: Vec<String> = rule
                    .keywords
                    .iter()
                    .filter(|keyword| content_lower.contains(&keyword.to_lowercase()))
                    .cloned()
                    .collect();
                if matched.len() >= MIN_KEYWORD_MATCHES {
                    let bump = KEYWORD_STEP * matched.len() as u32;
                    match detection.as_mut() {
                        Some(existing) => {
                            existing.confidence =
                                (existing.confidence as u32 + bump).min(MAX_CONFIDENCE) as u8;
                            existing.matched_keywords.extend(matched);
                        }
                        None => {
                            detection = Some(CustomBuildEvent {
                                event: event.clone(),
                                category: rule.category.clone(),
                                matched_keywords: matched,
                                confidence: (KEYWORD_BASE_CONFIDENCE + bump)
                                    .min(MAX_CONFIDENCE)
                                    as u8,
                            });
                        }
                    }
                }

                if let Some(found) = detection {
                    debug!(
                        "custom {} implementation in {} (confidence {})",
                        found.category, path, found.confidence
                    );
                    detections.push(found);
                }
            }
        }
        detections
    }

    /// Categories satisfied by an install command anywhere in the event set
    fn installed_categories(&self, events: &[RawEvent]) -> HashSet<String> {
        events
            .iter()
            .filter(|e| e.action == ActionKind::Bash)
            .filter_map(|e| self.rules.detect_install(&e.raw))
            .filter_map(|(_, package)| self.taxonomy.categorize(&package))
            .map(str::to_string)
            .collect()
    }

    /// Per-category install vs. custom-build counts, sorted descending by
    /// total count. Categories with neither installs nor custom builds are
    /// omitted.
    pub fn summary(
        &self,
        custom_builds: &[CustomBuildEvent],
        installs: &[ClassifiedEvent],
    ) -> Vec<CategoryAdoption> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

        for install in installs {
            let Some(category) = install
                .package_name
                .as_deref()
                .and_then(|name| self.taxonomy.categorize(name))
            else {
                continue;
            };
            counts.entry(category.to_string()).or_insert((0, 0)).0 += 1;
        }
        for build in custom_builds {
            counts.entry(build.category.clone()).or_insert((0, 0)).1 += 1;
        }

        let mut summary: Vec<CategoryAdoption> = counts
            .into_iter()
            .map(|(category, (install_count, custom_build_count))| {
                let total = install_count + custom_build_count;
                let pct = custom_build_count as f64 / total as f64 * 100.0;
                CategoryAdoption {
                    category,
                    install_count,
                    custom_build_count,
                    custom_build_pct: (pct * 100.0).round() / 100.0,
                }
            })
            .collect();
        summary.sort_by(|a, b| {
            let total_a = a.install_count + a.custom_build_count;
            let total_b = b.install_count + b.custom_build_count;
            total_b
                .cmp(&total_a)
                .then_with(|| a.category.cmp(&b.category))
        });
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AgentKind;
    use crate::types::{DiscoveryType, PackageManager};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn make_event(offset_sec: i64, action: ActionKind, raw: &str, result: Option<&str>) -> RawEvent {
        RawEvent {
            id: Uuid::new_v4(),
            session_id: "session-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
                + Duration::seconds(offset_sec),
            agent: AgentKind::ClaudeCode,
            action,
            raw: raw.to_string(),
            result: result.map(str::to_string),
            exit_code: Some(0),
            cwd: None,
        }
    }

    fn make_install(package: &str) -> ClassifiedEvent {
        ClassifiedEvent {
            event: make_event(0, ActionKind::Bash, &format!("npm install {package}"), None),
            is_install: true,
            package_name: Some(package.to_string()),
            package_manager: Some(PackageManager::Npm),
            classification: DiscoveryType::TrainingRecall,
            confidence: 60,
            abandoned: false,
            alternatives: vec![],
        }
    }

    fn detector() -> BuildVsBuyDetector {
        BuildVsBuyDetector::new(DetectorConfig::builtin().unwrap(), CategoryTaxonomy::default())
            .unwrap()
    }

    #[test]
    fn test_keyword_only_detection() {
        let events = vec![make_event(
            0,
            ActionKind::FileWrite,
            "src/utils/helpers.js",
            Some("a simple cache with ttl support that can memoize results"),
        )];
        let detections = detector().detect(&events);

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].category, "Caching");
        // 40 base + 10 x 3 keyword matches
        assert_eq!(detections[0].confidence, 70);
        assert_eq!(
            detections[0].matched_keywords,
            vec!["cache".to_string(), "ttl".to_string(), "memoize".to_string()]
        );
    }

    #[test]
    fn test_install_suppresses_category() {
        let events = vec![
            make_event(0, ActionKind::Bash, "npm install redis", None),
            make_event(
                10,
                ActionKind::FileWrite,
                "src/utils/helpers.js",
                Some("a simple cache with ttl support that can memoize results"),
            ),
        ];
        let detections = detector().detect(&events);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_path_only_detection() {
        let events = vec![make_event(
            0,
            ActionKind::FileWrite,
            "src/cache/store.ts",
            None,
        )];
        let detections = detector().detect(&events);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].category, "Caching");
        assert_eq!(detections[0].confidence, 60);
        assert!(detections[0].matched_keywords.is_empty());
    }

    #[test]
    fn test_path_and_keywords_merge() {
        let events = vec![make_event(
            0,
            ActionKind::FileWrite,
            "src/auth/token_service.py",
            Some("issue a jwt token after checking the password hash"),
        )];
        let detections = detector().detect(&events);

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].category, "Authentication");
        // 60 path + 10 x 4 matches (jwt, token, password, hash) capped at 95
        assert_eq!(detections[0].confidence, 95);
        assert_eq!(detections[0].matched_keywords.len(), 4);
    }

    #[test]
    fn test_single_keyword_is_not_enough() {
        let events = vec![make_event(
            0,
            ActionKind::FileWrite,
            "src/utils/misc.js",
            Some("this module has a cache somewhere"),
        )];
        let detections = detector().detect(&events);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_non_file_write_events_ignored() {
        let events = vec![make_event(
            0,
            ActionKind::Bash,
            "echo cache ttl memoize",
            Some("cache ttl memoize"),
        )];
        let detections = detector().detect(&events);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_summary_percentages() {
        let installs = vec![
            make_install("jsonwebtoken"),
            make_install("passport"),
            make_install("bcrypt"),
        ];
        let custom = vec![CustomBuildEvent {
            event: make_event(0, ActionKind::FileWrite, "src/auth/session.js", None),
            category: "Authentication".to_string(),
            matched_keywords: vec![],
            confidence: 60,
        }];
        let summary = detector().summary(&custom, &installs);

        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].category, "Authentication");
        assert_eq!(summary[0].install_count, 3);
        assert_eq!(summary[0].custom_build_count, 1);
        assert_eq!(summary[0].custom_build_pct, 25.00);
    }

    #[test]
    fn test_summary_sorted_by_total_desc() {
        let installs = vec![
            make_install("jsonwebtoken"),
            make_install("passport"),
            make_install("redis"),
        ];
        let summary = detector().summary(&[], &installs);
        assert_eq!(summary[0].category, "Authentication");
        assert_eq!(summary[1].category, "Caching");
    }
}
