//! Pattern classification of install events
//!
//! This module detects dependency-install actions in a session's event
//! stream and assigns each one a discovery-type classification, confidence,
//! abandonment flag, and considered-alternatives list.
//!
//! Both pattern tables are explicit ordered rule lists with first-match-wins
//! semantics; discovery rules run in strict priority order so the tie-break
//! behavior is stable (a user directive always beats weaker evidence).

use crate::error::AnalysisError;
use crate::schema::{ActionKind, RawEvent};
use crate::taxonomy::CategoryTaxonomy;
use crate::types::{ClassifiedEvent, DiscoveryType, PackageManager};
use log::debug;
use regex::Regex;

/// Manifest files whose reads count as pre-existing project context
const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
    "Gemfile",
];

/// One install-command rule: a package manager and the command pattern
/// that captures its argument list.
struct CommandRule {
    manager: PackageManager,
    pattern: Regex,
}

/// Ordered install/uninstall command rules, first match wins.
pub struct InstallRuleSet {
    installs: Vec<CommandRule>,
    uninstalls: Vec<CommandRule>,
}

impl InstallRuleSet {
    pub fn new() -> Result<Self, AnalysisError> {
        let rule = |manager, pattern: &str| -> Result<CommandRule, AnalysisError> {
            Ok(CommandRule {
                manager,
                pattern: Regex::new(pattern)?,
            })
        };
        let installs = vec![
            rule(PackageManager::Npm, r"^\s*npm\s+(?:install|add|i)\s+(.+)$")?,
            rule(PackageManager::Yarn, r"^\s*yarn\s+(?:global\s+)?add\s+(.+)$")?,
            rule(PackageManager::Pnpm, r"^\s*pnpm\s+(?:install|add|i)\s+(.+)$")?,
            rule(PackageManager::Bun, r"^\s*bun\s+(?:install|add|i)\s+(.+)$")?,
            rule(
                PackageManager::Pip,
                r"^\s*(?:pip3?|python3?\s+-m\s+pip)\s+install\s+(.+)$",
            )?,
            rule(PackageManager::Cargo, r"^\s*cargo\s+(?:add|install)\s+(.+)$")?,
            rule(PackageManager::Go, r"^\s*go\s+(?:get|install)\s+(.+)$")?,
            rule(PackageManager::Gem, r"^\s*gem\s+install\s+(.+)$")?,
        ];
        let uninstalls = vec![
            rule(
                PackageManager::Npm,
                r"^\s*npm\s+(?:uninstall|remove|rm|un)\s+(.+)$",
            )?,
            rule(PackageManager::Yarn, r"^\s*yarn\s+remove\s+(.+)$")?,
            rule(
                PackageManager::Pnpm,
                r"^\s*pnpm\s+(?:uninstall|remove|rm)\s+(.+)$",
            )?,
            rule(PackageManager::Bun, r"^\s*bun\s+remove\s+(.+)$")?,
            rule(PackageManager::Pip, r"^\s*pip3?\s+uninstall\s+(?:-y\s+)?(.+)$")?,
            rule(PackageManager::Cargo, r"^\s*cargo\s+(?:remove|uninstall)\s+(.+)$")?,
            rule(PackageManager::Gem, r"^\s*gem\s+uninstall\s+(.+)$")?,
        ];
        Ok(Self {
            installs,
            uninstalls,
        })
    }

    /// Detect an install command, returning the manager and the normalized
    /// package name. Non-matching commands return None; a match whose
    /// arguments are all flags (e.g. a bare lockfile install) also returns
    /// None.
    pub fn detect_install(&self, command: &str) -> Option<(PackageManager, String)> {
        Self::detect(&self.installs, command)
    }

    /// Detect an uninstall/removal command.
    pub fn detect_uninstall(&self, command: &str) -> Option<(PackageManager, String)> {
        Self::detect(&self.uninstalls, command)
    }

    fn detect(rules: &[CommandRule], command: &str) -> Option<(PackageManager, String)> {
        for rule in rules {
            if let Some(caps) = rule.pattern.captures(command) {
                let args = caps.get(1).map(|m| m.as_str())?;
                if let Some(name) = extract_package_name(args, rule.manager) {
                    return Some((rule.manager, name));
                }
                return None;
            }
        }
        None
    }
}

/// Pull the first non-flag token out of an install argument list and strip
/// its version suffix. npm scopes are preserved; the categorizer strips
/// them itself.
fn extract_package_name(args: &str, manager: PackageManager) -> Option<String> {
    let token = args
        .split_whitespace()
        .find(|token| !token.starts_with('-'))?;
    let name = match manager {
        PackageManager::Npm | PackageManager::Yarn | PackageManager::Pnpm | PackageManager::Bun => {
            strip_npm_version(token)
        }
        PackageManager::Pip => {
            let end = token
                .find(|c| matches!(c, '=' | '<' | '>' | '~' | '[' | '!'))
                .unwrap_or(token.len());
            &token[..end]
        }
        PackageManager::Cargo | PackageManager::Gem => {
            token.split('@').next().unwrap_or(token)
        }
        PackageManager::Go => {
            let without_version = token.split('@').next().unwrap_or(token);
            without_version
                .rsplit('/')
                .next()
                .unwrap_or(without_version)
        }
    };
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Strip an npm version suffix (`pkg@1.2.3`, `@scope/pkg@^2`) keeping the
/// scope prefix intact.
fn strip_npm_version(token: &str) -> &str {
    match token.rfind('@') {
        Some(0) | None => token,
        Some(pos) => &token[..pos],
    }
}

/// Per-session classifier for install events.
///
/// Processes exactly one session at a time; cross-session reads are
/// structurally impossible because only that session's slice is provided.
pub struct PatternClassifier {
    taxonomy: CategoryTaxonomy,
    rules: InstallRuleSet,
}

impl PatternClassifier {
    pub fn new(taxonomy: CategoryTaxonomy) -> Result<Self, AnalysisError> {
        Ok(Self {
            taxonomy,
            rules: InstallRuleSet::new()?,
        })
    }

    pub fn rules(&self) -> &InstallRuleSet {
        &self.rules
    }

    /// Classify all install events in a time-ordered session event list.
    ///
    /// Returns one `ClassifiedEvent` per detected install, in event order.
    /// Non-install events produce no output but feed the evidence window.
    pub fn classify(&self, session_events: &[RawEvent]) -> Vec<ClassifiedEvent> {
        let mut classified = Vec::new();
        for (idx, event) in session_events.iter().enumerate() {
            if event.action != ActionKind::Bash {
                continue;
            }
            let Some((manager, package)) = self.rules.detect_install(&event.raw) else {
                continue;
            };

            let window = &session_events[..idx];
            let alternatives = self.collect_alternatives(window, &package);
            let (classification, confidence) =
                self.assign_discovery_type(window, &package, &alternatives);
            let abandoned = self.is_abandoned(&session_events[idx + 1..], &package);

            debug!(
                "install {} via {} classified as {} (confidence {})",
                package,
                manager.as_str(),
                classification.as_str(),
                confidence
            );

            classified.push(ClassifiedEvent {
                event: event.clone(),
                is_install: true,
                package_name: Some(package),
                package_manager: Some(manager),
                classification,
                confidence: confidence.min(100),
                abandoned,
                alternatives,
            });
        }
        classified
    }

    /// Discovery rules in strict priority order; first satisfied rule wins.
    fn assign_discovery_type(
        &self,
        window: &[RawEvent],
        package: &str,
        alternatives: &[String],
    ) -> (DiscoveryType, u8) {
        if let Some(confidence) = self.user_directed(window, package) {
            return (DiscoveryType::UserDirected, confidence);
        }
        if let Some(confidence) = self.proactive_search(alternatives) {
            return (DiscoveryType::ProactiveSearch, confidence);
        }
        if self.reactive_search(window) {
            return (DiscoveryType::ReactiveSearch, 75);
        }
        if let Some(confidence) = self.context_inheritance(window, package) {
            return (DiscoveryType::ContextInheritance, confidence);
        }
        if self.training_recall(window, package) {
            return (DiscoveryType::TrainingRecall, 60);
        }
        (DiscoveryType::Unknown, 30)
    }

    /// Rule 1: the package name appears in a user-originated instruction.
    /// An explicit directive ("install X" / "use X") scores above a bare
    /// mention.
    fn user_directed(&self, window: &[RawEvent], package: &str) -> Option<u8> {
        let package_lower = package.to_lowercase();
        let mut best: Option<u8> = None;
        for event in window {
            if event.action != ActionKind::UserMessage {
                continue;
            }
            let text = event.raw.to_lowercase();
            if !text.contains(&package_lower) {
                continue;
            }
            let directive = text.contains(&format!("install {package_lower}"))
                || text.contains(&format!("use {package_lower}"))
                || text.contains(&format!("add {package_lower}"));
            let confidence = if directive { 95 } else { 85 };
            best = Some(best.map_or(confidence, |b| b.max(confidence)));
        }
        best
    }

    /// Rule 2: two or more distinct same-category candidates appeared before
    /// the choice (at least one alternative after excluding the chosen
    /// package).
    fn proactive_search(&self, alternatives: &[String]) -> Option<u8> {
        if alternatives.is_empty() {
            return None;
        }
        let confidence = (70 + 5 * alternatives.len()).min(90);
        Some(confidence as u8)
    }

    /// Rule 3: a failure, then at least one search, then the install.
    fn reactive_search(&self, window: &[RawEvent]) -> bool {
        let Some(failure_idx) = window.iter().position(|e| e.is_failure()) else {
            return false;
        };
        window[failure_idx + 1..]
            .iter()
            .any(|e| e.action == ActionKind::Search)
    }

    /// Rule 4: the package already appeared in a manifest or file the agent
    /// read, with no intervening search between that read and the install.
    fn context_inheritance(&self, window: &[RawEvent], package: &str) -> Option<u8> {
        let package_lower = package.to_lowercase();
        let mut hit: Option<(usize, u8)> = None;
        for (idx, event) in window.iter().enumerate() {
            if event.action != ActionKind::Read {
                continue;
            }
            let Some(content) = &event.result else {
                continue;
            };
            if !content.to_lowercase().contains(&package_lower) {
                continue;
            }
            let confidence = if is_manifest_path(&event.raw) { 80 } else { 65 };
            hit = Some((idx, confidence));
        }
        let (read_idx, confidence) = hit?;
        let searched_after = window[read_idx + 1..]
            .iter()
            .any(|e| e.action == ActionKind::Search);
        if searched_after {
            None
        } else {
            Some(confidence)
        }
    }

    /// Rule 5: no observable search and no pre-existing context at all.
    /// A window that contains searches which satisfied none of the earlier
    /// rules is *not* training recall; it falls through to Unknown.
    fn training_recall(&self, window: &[RawEvent], package: &str) -> bool {
        let package_lower = package.to_lowercase();
        let searched = window.iter().any(|e| e.action == ActionKind::Search);
        let context = window.iter().any(|e| {
            e.action == ActionKind::Read
                && e.result
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&package_lower))
        });
        !searched && !context
    }

    /// Same-category candidates seen strictly before the install, in
    /// first-appearance order, chosen package excluded. Candidates come
    /// from search event text and from competing installs.
    fn collect_alternatives(&self, window: &[RawEvent], package: &str) -> Vec<String> {
        let Some(category) = self.taxonomy.categorize(package) else {
            return Vec::new();
        };
        let category = category.to_string();
        let package_lower = package.to_lowercase();

        let mut seen = Vec::new();
        let mut push = |name: String| {
            let lower = name.to_lowercase();
            if lower != package_lower && !seen.iter().any(|s: &String| s.to_lowercase() == lower) {
                seen.push(name);
            }
        };

        for event in window {
            match event.action {
                ActionKind::Search => {
                    let mut text = event.raw.clone();
                    if let Some(result) = &event.result {
                        text.push('\n');
                        text.push_str(result);
                    }
                    for name in self.taxonomy.members_in_text(&category, &text) {
                        push(name);
                    }
                }
                ActionKind::Bash => {
                    if let Some((_, other)) = self.rules.detect_install(&event.raw) {
                        if self.taxonomy.categorize(&other) == Some(category.as_str()) {
                            push(other);
                        }
                    }
                }
                _ => {}
            }
        }
        seen
    }

    /// An install is abandoned if the identical package is later removed,
    /// or a different same-category package is installed in its place.
    fn is_abandoned(&self, later_events: &[RawEvent], package: &str) -> bool {
        let package_lower = package.to_lowercase();
        let category = self.taxonomy.categorize(package).map(str::to_string);
        for event in later_events {
            if event.action != ActionKind::Bash {
                continue;
            }
            if let Some((_, removed)) = self.rules.detect_uninstall(&event.raw) {
                if removed.to_lowercase() == package_lower {
                    return true;
                }
            }
            if let Some((_, other)) = self.rules.detect_install(&event.raw) {
                if other.to_lowercase() != package_lower {
                    if let Some(cat) = &category {
                        if self.taxonomy.categorize(&other) == Some(cat.as_str()) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

fn is_manifest_path(path: &str) -> bool {
    MANIFEST_FILES
        .iter()
        .any(|manifest| path.ends_with(manifest))
}
