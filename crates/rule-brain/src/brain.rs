//! RuleBrain: answers messages from a table of pattern rules.

use std::path::{Path, PathBuf};

use brain_core::{async_trait, Brain, BrainError, InboundMessage, OutboundMessage};
use tracing::{debug, info, warn};

use crate::config::RuleBrainConfig;
use crate::context::{Context, MatchResult};
use crate::error::RuleBrainError;
use crate::rule::RuleTable;

/// A brain that picks canned responses from a rule table.
///
/// The table is replaced wholesale by [`RuleBrain::load`] and is read-only
/// while matching. Loading needs `&mut self`, so a brain shared behind an
/// `Arc` cannot be reloaded while other callers match against it.
#[derive(Debug, Clone)]
pub struct RuleBrain {
    config: RuleBrainConfig,
    rules: RuleTable,
    source: Option<PathBuf>,
}

impl RuleBrain {
    /// Create a brain with the given id and no rules.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(RuleBrainConfig::builder().id(id).build())
    }

    /// Create a brain from configuration without loading any rules.
    pub fn with_config(config: RuleBrainConfig) -> Self {
        info!(
            "RuleBrain {} initialized (wildcard: {:?}, case_sensitive: {})",
            config.id, config.wildcard, config.case_sensitive
        );
        let rules = RuleTable::empty(config.load_options());
        Self {
            config,
            rules,
            source: None,
        }
    }

    /// Create a RuleBrain from environment variables, loading
    /// `RULE_BRAIN_RULES_PATH` when it is set.
    ///
    /// See [`RuleBrainConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, BrainError> {
        let config = RuleBrainConfig::from_env()?;
        let rules_path = config.rules_path.clone();
        let mut brain = Self::with_config(config);
        if let Some(path) = rules_path {
            brain.load(path)?;
        }
        Ok(brain)
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Get the configuration.
    pub fn config(&self) -> &RuleBrainConfig {
        &self.config
    }

    /// The currently loaded rule table.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Path of the last successfully loaded rules file.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Load rules from a file, replacing the current table.
    ///
    /// The file is parsed completely before anything is replaced; on error
    /// the previous table stays in place.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), RuleBrainError> {
        let path = path.as_ref();
        let table = match RuleTable::from_path(path, &self.config.load_options()) {
            Ok(table) => table,
            Err(e) => {
                warn!("RuleBrain {} failed to load {}: {}", self.config.id, path.display(), e);
                return Err(e.into());
            }
        };

        self.install(table);
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Load rules from source text, replacing the current table.
    pub fn load_str(&mut self, text: &str) -> Result<(), RuleBrainError> {
        let table = RuleTable::parse(text, &self.config.load_options())?;
        self.install(table);
        self.source = None;
        Ok(())
    }

    fn install(&mut self, table: RuleTable) {
        info!(
            "RuleBrain {} loaded {} rules (fallback: {}, fingerprint: {})",
            self.config.id,
            table.len(),
            table.fallback().is_some(),
            table.fingerprint().unwrap_or("-")
        );
        if table.fallback().is_none() {
            warn!(
                "RuleBrain {} has no wildcard rule; unmatched messages will fail",
                self.config.id
            );
        }
        self.rules = table;
    }

    /// Find the best response for a context without modifying it.
    pub fn match_context(&self, context: &Context) -> Result<MatchResult, RuleBrainError> {
        self.rules.find_best(context)
    }

    /// Match a context and record the best result on it.
    ///
    /// Returns `true` whenever a result was recorded, including the wildcard
    /// fallback. Querying again with the same table records the same result.
    pub fn query(&self, context: &mut Context) -> Result<bool, RuleBrainError> {
        self.rules.contains(context)
    }
}

#[async_trait]
impl Brain for RuleBrain {
    async fn process(&self, message: InboundMessage) -> Result<OutboundMessage, BrainError> {
        let context = Context::from(&message);
        let result = self.match_context(&context)?;

        debug!(
            "RuleBrain {} answering {} with rule {} ({:?})",
            self.config.id, message.sender, result.rule_index, result.kind
        );

        Ok(OutboundMessage::reply_to(&message, result.response))
    }

    fn name(&self) -> &str {
        &self.config.id
    }

    async fn is_ready(&self) -> bool {
        self.rules.fallback().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MatchKind;

    const RULES: &str = "\
pattern,response
hello,Hi there! How can I assist you today?
good morning,Good morning! How can I make your day better?
*,I have no idea how to respond!
";

    fn loaded() -> RuleBrain {
        let mut brain = RuleBrain::new("test-bot");
        brain.load_str(RULES).unwrap();
        brain
    }

    #[test]
    fn test_new_brain_is_empty() {
        let brain = RuleBrain::new("test-bot");
        assert_eq!(brain.id(), "test-bot");
        assert!(brain.rules().is_empty());
        assert!(brain.source().is_none());
    }

    #[test]
    fn test_match_context_is_pure() {
        let brain = loaded();
        let ctx = Context::from_message("hello");

        let result = brain.match_context(&ctx).unwrap();
        assert_eq!(result.response, "Hi there! How can I assist you today?");
        assert_eq!(result.kind, MatchKind::Rule);
        assert!(!ctx.is_matched());
    }

    #[test]
    fn test_query_is_idempotent() {
        let brain = loaded();
        let mut ctx = Context::from_message("good morning");

        assert!(brain.query(&mut ctx).unwrap());
        let first = ctx.best_result().map(str::to_string);
        assert!(brain.query(&mut ctx).unwrap());

        assert_eq!(ctx.best_result().map(str::to_string), first);
    }

    #[test]
    fn test_query_fallback_returns_true() {
        let brain = loaded();
        let mut ctx = Context::from_message("Where is the bathroom?");

        assert!(brain.query(&mut ctx).unwrap());
        assert_eq!(ctx.best_result(), Some("I have no idea how to respond!"));
    }

    #[test]
    fn test_query_empty_brain_fails() {
        let brain = RuleBrain::new("test-bot");
        let mut ctx = Context::from_message("hello");

        assert!(matches!(brain.query(&mut ctx), Err(RuleBrainError::NoFallbackRule)));
        assert!(ctx.best_result().is_none());
    }

    #[test]
    fn test_failed_load_str_keeps_table() {
        let mut brain = loaded();
        assert!(brain.load_str("pattern,response\nbroken\n").is_err());
        assert_eq!(brain.rules().len(), 3);
    }

    #[test]
    fn test_case_sensitive_config() {
        let config = RuleBrainConfig::builder().id("strict").case_sensitive(true).build();
        let mut brain = RuleBrain::with_config(config);
        brain.load_str(RULES).unwrap();

        let result = brain.match_context(&Context::from_message("Hello")).unwrap();
        assert!(result.is_fallback());
    }

    #[tokio::test]
    async fn test_process_direct() {
        let brain = loaded();
        let msg = InboundMessage::direct("+15551234567", "hello", 1234567890);

        let response = brain.process(msg).await.unwrap();
        assert_eq!(response.text, "Hi there! How can I assist you today?");
        assert_eq!(response.recipient, "+15551234567");
        assert!(!response.is_group);
    }

    #[tokio::test]
    async fn test_process_group() {
        let brain = loaded();
        let msg = InboundMessage::group("+15551234567", "what?", 1234567890, "group123");

        let response = brain.process(msg).await.unwrap();
        assert_eq!(response.text, "I have no idea how to respond!");
        assert_eq!(response.recipient, "group123");
        assert!(response.is_group);
    }

    #[tokio::test]
    async fn test_process_without_rules_is_unavailable() {
        let brain = RuleBrain::new("test-bot");
        let msg = InboundMessage::direct("+15551234567", "hello", 1234567890);

        let err = brain.process(msg).await.unwrap_err();
        assert!(matches!(err, BrainError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_brain_name_and_readiness() {
        let empty = RuleBrain::new("test-bot");
        assert_eq!(empty.name(), "test-bot");
        assert!(!empty.is_ready().await);

        assert!(loaded().is_ready().await);
    }
}
