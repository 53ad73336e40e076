//! Error types for depscope

use thiserror::Error;

/// Errors that can occur during analysis.
///
/// Malformed event *content* is never an error (spec'd degradation to safe
/// defaults); these variants cover the construction and serialization
/// boundaries only.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid pattern in injected configuration: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid taxonomy: {0}")]
    TaxonomyError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
