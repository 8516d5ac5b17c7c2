//! Configuration for RuleBrain.

use brain_core::BrainError;
use std::env;
use std::path::PathBuf;

use crate::rule::{LoadOptions, DEFAULT_WILDCARD};

/// Default brain identifier.
pub const DEFAULT_BRAIN_ID: &str = "rule-brain";

/// Configuration for RuleBrain.
#[derive(Debug, Clone)]
pub struct RuleBrainConfig {
    /// Identifier used in logs and as the brain name.
    pub id: String,

    /// Rules file to load on startup.
    pub rules_path: Option<PathBuf>,

    /// Field delimiter of the rules file.
    pub delimiter: u8,

    /// Match-anything token in patterns.
    pub wildcard: String,

    /// Match case-sensitively.
    pub case_sensitive: bool,
}

impl Default for RuleBrainConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_BRAIN_ID.to_string(),
            rules_path: None,
            delimiter: b',',
            wildcard: DEFAULT_WILDCARD.to_string(),
            case_sensitive: false,
        }
    }
}

impl RuleBrainConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `RULE_BRAIN_ID` - Brain identifier (default: rule-brain)
    /// - `RULE_BRAIN_RULES_PATH` - Rules file loaded by `RuleBrain::from_env`
    /// - `RULE_BRAIN_DELIMITER` - Single-byte field delimiter, or `tab` (default: `,`)
    /// - `RULE_BRAIN_WILDCARD` - Wildcard token (default: `*`)
    /// - `RULE_BRAIN_CASE_SENSITIVE` - Case-sensitive matching (default: false)
    pub fn from_env() -> Result<Self, BrainError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, BrainError> {
        let id = get("RULE_BRAIN_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BRAIN_ID.to_string());

        let rules_path = get("RULE_BRAIN_RULES_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let delimiter = match get("RULE_BRAIN_DELIMITER") {
            Some(value) => parse_delimiter(&value)?,
            None => b',',
        };

        let wildcard = get("RULE_BRAIN_WILDCARD").unwrap_or_else(|| DEFAULT_WILDCARD.to_string());
        if wildcard.trim().is_empty() {
            return Err(BrainError::Configuration(
                "RULE_BRAIN_WILDCARD must not be empty".to_string(),
            ));
        }

        let case_sensitive = get("RULE_BRAIN_CASE_SENSITIVE")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            id,
            rules_path,
            delimiter,
            wildcard,
            case_sensitive,
        })
    }

    /// Options used when loading rule files.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            wildcard: self.wildcard.clone(),
            case_sensitive: self.case_sensitive,
        }
    }

    /// Create a new config builder.
    pub fn builder() -> RuleBrainConfigBuilder {
        RuleBrainConfigBuilder::default()
    }
}

fn parse_delimiter(value: &str) -> Result<u8, BrainError> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
        other => Err(BrainError::Configuration(format!(
            "RULE_BRAIN_DELIMITER must be a single ASCII character, got {:?}",
            other
        ))),
    }
}

/// Builder for RuleBrainConfig.
#[derive(Debug, Default)]
pub struct RuleBrainConfigBuilder {
    config: RuleBrainConfig,
}

impl RuleBrainConfigBuilder {
    /// Set the brain identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    /// Set the rules file loaded on startup.
    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_path = Some(path.into());
        self
    }

    /// Set the field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// Set the wildcard token.
    pub fn wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.config.wildcard = wildcard.into();
        self
    }

    /// Enable or disable case-sensitive matching.
    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.config.case_sensitive = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RuleBrainConfig {
        self.config
    }
}
