//! Category taxonomy and package categorization
//!
//! This module holds the two static configuration tables injected into the
//! pipeline at construction time:
//! - the category taxonomy (functional category → member package names)
//! - the custom-build detector tables (per-category path patterns and
//!   domain keywords)
//!
//! Both are immutable after construction so tests can substitute their own.

use crate::error::AnalysisError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One taxonomy category and its member packages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub packages: Vec<String>,
}

/// Static grouping of packages by functional domain.
///
/// Category order is significant: the fuzzy categorization fallback scans
/// categories in declaration order and the first hit wins.
#[derive(Debug, Clone)]
pub struct CategoryTaxonomy {
    entries: Vec<CategoryEntry>,
    /// Lowercase package name → index into `entries`
    reverse: HashMap<String, usize>,
}

impl Default for CategoryTaxonomy {
    fn default() -> Self {
        Self::from_entries(builtin_taxonomy())
    }
}

impl CategoryTaxonomy {
    /// Build a taxonomy from ordered (category, members) entries.
    pub fn from_entries(entries: Vec<CategoryEntry>) -> Self {
        let mut reverse = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            for package in &entry.packages {
                reverse.entry(package.to_lowercase()).or_insert(idx);
            }
        }
        Self { entries, reverse }
    }

    /// Ordered category entries
    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    /// Resolve a package name to its category.
    ///
    /// Rules in order, first hit wins:
    /// 1. Exact case-insensitive match against the reverse index.
    /// 2. Scope strip: `@scope/pkg` retried as `pkg`.
    /// 3. Fuzzy fallback: bidirectional case-insensitive substring scan in
    ///    taxonomy declaration order.
    ///
    /// The fuzzy fallback is best-effort and can collide on short names
    /// (e.g. "ws" against any longer name containing "ws"); resolution is
    /// deterministic (first taxonomy-order match) rather than an error.
    pub fn categorize(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        if let Some(&idx) = self.reverse.get(&lower) {
            return Some(&self.entries[idx].name);
        }

        if let Some(stripped) = strip_scope(&lower) {
            if let Some(&idx) = self.reverse.get(stripped) {
                return Some(&self.entries[idx].name);
            }
        }

        for entry in &self.entries {
            for package in &entry.packages {
                let pkg_lower = package.to_lowercase();
                if pkg_lower.contains(&lower) || lower.contains(&pkg_lower) {
                    return Some(&entry.name);
                }
            }
        }
        None
    }

    /// Member packages of `category` that appear as whole words in `text`,
    /// in first-appearance order within the member list.
    pub fn members_in_text(&self, category: &str, text: &str) -> Vec<String> {
        let text_lower = text.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.name == category)
            .flat_map(|entry| entry.packages.iter())
            .filter(|package| contains_word(&text_lower, &package.to_lowercase()))
            .cloned()
            .collect()
    }
}

/// Strip an npm scope prefix (`@scope/pkg` → `pkg`)
fn strip_scope(name: &str) -> Option<&str> {
    if name.starts_with('@') {
        name.split_once('/').map(|(_, rest)| rest)
    } else {
        None
    }
}

/// Whole-word containment: `needle` occurs in `haystack` with no adjacent
/// identifier characters. Plain substring matching would flood short member
/// names ("ws", "got") with false positives in prose.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '-' || c == '_' || c == '@';
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let before_ok = begin == 0 || !haystack[..begin].chars().next_back().is_some_and(is_ident);
        let after_ok = end == haystack.len() || !haystack[end..].chars().next().is_some_and(is_ident);
        if before_ok && after_ok {
            return true;
        }
        // Advance past this occurrence; end is a valid char boundary
        start = end;
    }
    false
}

/// One custom-build detection rule: a path pattern plus domain keywords
/// for a single category.
#[derive(Debug, Clone)]
pub struct CategoryDetector {
    pub category: String,
    pub path_pattern: Regex,
    pub keywords: Vec<String>,
}

/// Detector configuration: ordered per-category rules
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    rules: Vec<CategoryDetector>,
}

impl DetectorConfig {
    /// Build from explicit (category, path pattern, keywords) rules.
    pub fn from_rules(
        rules: Vec<(String, String, Vec<String>)>,
    ) -> Result<Self, AnalysisError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (category, pattern, keywords) in rules {
            compiled.push(CategoryDetector {
                category,
                path_pattern: Regex::new(&pattern)?,
                keywords,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Built-in detector tables for the default taxonomy categories.
    pub fn builtin() -> Result<Self, AnalysisError> {
        Self::from_rules(builtin_detectors())
    }

    pub fn rules(&self) -> &[CategoryDetector] {
        &self.rules
    }
}

fn entry(name: &str, packages: &[&str]) -> CategoryEntry {
    CategoryEntry {
        name: name.to_string(),
        packages: packages.iter().map(|p| p.to_string()).collect(),
    }
}

/// Built-in taxonomy. Order matters for the fuzzy fallback.
fn builtin_taxonomy() -> Vec<CategoryEntry> {
    vec![
        entry(
            "Authentication",
            &[
                "jsonwebtoken",
                "passport",
                "bcrypt",
                "bcryptjs",
                "jose",
                "next-auth",
                "oauth2-server",
                "express-session",
                "argon2",
            ],
        ),
        entry(
            "Payments",
            &["stripe", "braintree", "square", "paypal-rest-sdk", "razorpay"],
        ),
        entry(
            "Caching",
            &["redis", "ioredis", "lru-cache", "node-cache", "memcached", "quick-lru", "keyv"],
        ),
        entry(
            "Cryptography",
            &["crypto-js", "node-forge", "tweetnacl", "libsodium-wrappers", "ring"],
        ),
        entry(
            "Database",
            &[
                "prisma",
                "sequelize",
                "typeorm",
                "mongoose",
                "knex",
                "pg",
                "mysql2",
                "sqlalchemy",
                "diesel",
                "sqlx",
            ],
        ),
        entry(
            "HTTP Clients",
            &["axios", "got", "node-fetch", "superagent", "undici", "ky", "requests", "reqwest"],
        ),
        entry(
            "Web Frameworks",
            &["express", "fastify", "koa", "hapi", "flask", "django", "actix-web", "axum"],
        ),
        entry(
            "Validation",
            &["zod", "joi", "yup", "ajv", "class-validator", "validator", "pydantic"],
        ),
        entry(
            "Testing",
            &["jest", "mocha", "vitest", "chai", "supertest", "pytest", "sinon"],
        ),
        entry(
            "State Management",
            &["redux", "zustand", "mobx", "pinia", "recoil", "jotai"],
        ),
        entry(
            "Date/Time",
            &["dayjs", "date-fns", "moment", "luxon", "chrono"],
        ),
        entry(
            "Logging",
            &["winston", "pino", "bunyan", "morgan", "loguru", "log4js"],
        ),
        entry(
            "CSS Tooling",
            &["tailwindcss", "sass", "less", "postcss", "autoprefixer", "styled-components"],
        ),
        entry("Utilities", &["lodash", "ramda", "underscore", "immer"]),
        entry(
            "CLI Tooling",
            &["commander", "yargs", "inquirer", "chalk", "clap"],
        ),
        entry("Realtime", &["ws", "socket.io", "sockjs"]),
    ]
}

/// Built-in custom-build detector rules: (category, path pattern, keywords).
fn builtin_detectors() -> Vec<(String, String, Vec<String>)> {
    let rule = |category: &str, pattern: &str, keywords: &[&str]| {
        (
            category.to_string(),
            pattern.to_string(),
            keywords.iter().map(|k| k.to_string()).collect(),
        )
    };
    vec![
        rule(
            "Authentication",
            r"(?i)(auth|login|session|jwt|token)",
            &["jwt", "token", "password", "login", "session", "oauth", "bearer", "hash"],
        ),
        rule(
            "Caching",
            r"(?i)cach(e|ing)",
            &["cache", "ttl", "memoize", "evict", "lru", "expire", "invalidate"],
        ),
        rule(
            "Validation",
            r"(?i)(valid|schema|sanitiz)",
            &["validate", "schema", "sanitize", "required", "constraint"],
        ),
        rule(
            "HTTP Clients",
            r"(?i)(http_?client|fetcher|request_?builder)",
            &["fetch", "retry", "timeout", "backoff", "http"],
        ),
        rule(
            "Logging",
            r"(?i)(logger|logging)",
            &["logger", "log level", "rotate", "append", "stderr"],
        ),
        rule(
            "Date/Time",
            r"(?i)(date|time)_?(util|helper|format)",
            &["timezone", "iso8601", "utc", "offset", "strftime"],
        ),
        rule(
            "Realtime",
            r"(?i)(websocket|socket_?server)",
            &["websocket", "handshake", "frame", "ping", "pong"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_match() {
        let taxonomy = CategoryTaxonomy::default();
        assert_eq!(taxonomy.categorize("jsonwebtoken"), Some("Authentication"));
        assert_eq!(taxonomy.categorize("STRIPE"), Some("Payments"));
    }

    #[test]
    fn test_scope_stripped_match() {
        let taxonomy = CategoryTaxonomy::default();
        assert_eq!(
            taxonomy.categorize("@myorg/jsonwebtoken"),
            Some("Authentication")
        );
    }

    #[test]
    fn test_fuzzy_match_either_direction() {
        let taxonomy = CategoryTaxonomy::default();
        // Input contains a known name
        assert_eq!(taxonomy.categorize("redis-client"), Some("Caching"));
        // A known name contains the input
        assert_eq!(taxonomy.categorize("webtoken"), Some("Authentication"));
    }

    #[test]
    fn test_fuzzy_collision_is_deterministic() {
        let taxonomy = CategoryTaxonomy::default();
        // "ws" matches several longer names by substring; the first category
        // in declaration order wins every time.
        let first = taxonomy.categorize("ws").map(str::to_string);
        for _ in 0..10 {
            assert_eq!(taxonomy.categorize("ws").map(str::to_string), first);
        }
    }

    #[test]
    fn test_no_match_returns_none() {
        let taxonomy = CategoryTaxonomy::default();
        assert_eq!(taxonomy.categorize("left-pad-enterprise-xyz-qqq"), None);
    }

    #[test]
    fn test_members_in_text_uses_word_boundaries() {
        let taxonomy = CategoryTaxonomy::default();
        let text = "Comparing axios vs got for http requests";
        let found = taxonomy.members_in_text("HTTP Clients", text);
        assert!(found.contains(&"axios".to_string()));
        assert!(found.contains(&"got".to_string()));

        // "got" embedded inside a word must not match
        let found = taxonomy.members_in_text("HTTP Clients", "forgotten lore");
        assert!(!found.contains(&"got".to_string()));
    }

    #[test]
    fn test_custom_taxonomy_injection() {
        let taxonomy = CategoryTaxonomy::from_entries(vec![CategoryEntry {
            name: "Widgets".to_string(),
            packages: vec!["widgetlib".to_string()],
        }]);
        assert_eq!(taxonomy.categorize("widgetlib"), Some("Widgets"));
        assert_eq!(taxonomy.categorize("jsonwebtoken"), None);
    }

    #[test]
    fn test_builtin_detectors_compile() {
        let config = DetectorConfig::builtin().unwrap();
        assert!(!config.rules().is_empty());
        let caching = config
            .rules()
            .iter()
            .find(|r| r.category == "Caching")
            .unwrap();
        assert!(caching.path_pattern.is_match("src/cache/store.ts"));
        assert!(!caching.path_pattern.is_match("src/utils/helpers.js"));
    }
}
