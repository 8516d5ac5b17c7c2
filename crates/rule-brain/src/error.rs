//! Error types for rule loading and matching.

use std::path::PathBuf;

use brain_core::BrainError;
use thiserror::Error;

/// Errors raised while loading a rule table.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    /// The rules file could not be opened or read.
    #[error("failed to read rules from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A reader-supplied rule source could not be read.
    #[error("failed to read rules: {0}")]
    Read(#[source] std::io::Error),

    /// The source is not valid UTF-8 delimited text.
    #[error("malformed rules source: {0}")]
    Csv(#[from] csv::Error),

    /// A row lacks a required cell.
    #[error("row {row}: missing required field `{field}`")]
    MissingField { row: u64, field: &'static str },

    /// A cell holds a value that cannot be parsed.
    #[error("row {row}: invalid value {value:?} for field `{field}`")]
    InvalidField {
        row: u64,
        field: &'static str,
        value: String,
    },

    /// A cell could not be compiled into a pattern.
    #[error("row {row}: invalid pattern in field `{field}`: {source}")]
    InvalidPattern {
        row: u64,
        field: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors that can occur while loading rules or answering a context.
#[derive(Debug, Error)]
pub enum RuleBrainError {
    /// The rule table could not be loaded.
    #[error("rule load error: {0}")]
    RuleLoad(#[from] RuleLoadError),

    /// The context payload has no usable `message` field.
    #[error("context format error: {0}")]
    ContextFormat(String),

    /// Nothing matched and the table has no wildcard rule to fall back to.
    #[error("no fallback rule: nothing matched and the rule table has no wildcard rule")]
    NoFallbackRule,
}

impl From<RuleBrainError> for BrainError {
    fn from(err: RuleBrainError) -> Self {
        match err {
            RuleBrainError::RuleLoad(e) => BrainError::Configuration(e.to_string()),
            RuleBrainError::ContextFormat(msg) => BrainError::ProcessingFailed(msg),
            e @ RuleBrainError::NoFallbackRule => BrainError::Unavailable(e.to_string()),
        }
    }
}
