//! A single message-matching attempt and its outcome.

use brain_core::InboundMessage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RuleBrainError;
use crate::rule::{Rule, Specificity};

/// Payload key holding the message text.
pub const MESSAGE_FIELD: &str = "message";

/// Whether a result came from a regular rule or the wildcard fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Rule,
    Fallback,
}

/// The outcome of matching a context against a rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Response of the winning rule.
    pub response: String,
    /// Declaration index of the winning rule.
    pub rule_index: usize,
    pub kind: MatchKind,
    pub specificity: Specificity,
}

impl MatchResult {
    pub(crate) fn from_rule(rule: &Rule, kind: MatchKind) -> Self {
        Self {
            response: rule.response().to_string(),
            rule_index: rule.index(),
            kind,
            specificity: rule.specificity(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == MatchKind::Fallback
    }
}

/// One message to answer, plus the best result once matched.
///
/// The payload is an arbitrary JSON object; only `message` is required, and
/// it is checked when the context is matched rather than when it is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    payload: Map<String, Value>,
    best: Option<MatchResult>,
}

impl Context {
    /// Create a context from a payload object.
    pub fn new(payload: Map<String, Value>) -> Self {
        Self {
            payload,
            best: None,
        }
    }

    /// Create a context from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, RuleBrainError> {
        match value {
            Value::Object(payload) => Ok(Self::new(payload)),
            other => Err(RuleBrainError::ContextFormat(format!(
                "payload must be an object, got {}",
                other
            ))),
        }
    }

    /// Create a context holding just a message.
    pub fn from_message(text: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert(MESSAGE_FIELD.to_string(), Value::String(text.into()));
        Self::new(payload)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The message text.
    ///
    /// Fails with [`RuleBrainError::ContextFormat`] if `message` is absent or
    /// not a string.
    pub fn message(&self) -> Result<&str, RuleBrainError> {
        match self.payload.get(MESSAGE_FIELD) {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(RuleBrainError::ContextFormat(format!(
                "`{}` must be a string, got {}",
                MESSAGE_FIELD, other
            ))),
            None => Err(RuleBrainError::ContextFormat(format!(
                "payload has no `{}` field",
                MESSAGE_FIELD
            ))),
        }
    }

    /// A string field of the payload.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// Record a match result, replacing any earlier one.
    pub fn apply(&mut self, result: &MatchResult) {
        self.best = Some(result.clone());
    }

    /// Response chosen for this context, if it has been matched.
    pub fn best_result(&self) -> Option<&str> {
        self.best.as_ref().map(|b| b.response.as_str())
    }

    /// Index of the rule that produced the best result.
    pub fn matched_rule(&self) -> Option<usize> {
        self.best.as_ref().map(|b| b.rule_index)
    }

    pub fn match_result(&self) -> Option<&MatchResult> {
        self.best.as_ref()
    }

    pub fn is_matched(&self) -> bool {
        self.best.is_some()
    }
}

impl From<&InboundMessage> for Context {
    fn from(message: &InboundMessage) -> Self {
        let mut payload = Map::new();
        payload.insert(MESSAGE_FIELD.to_string(), Value::String(message.text.clone()));
        payload.insert("sender".to_string(), Value::String(message.sender.clone()));
        if let Some(ref group_id) = message.group_id {
            payload.insert("group_id".to_string(), Value::String(group_id.clone()));
        }
        Self::new(payload)
    }
}
