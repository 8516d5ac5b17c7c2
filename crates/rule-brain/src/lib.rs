//! Rule-table brain implementation.
//!
//! This crate answers messages from a table of pattern → response rules
//! loaded from a delimited (CSV) file. The most specific matching rule wins;
//! a wildcard rule answers everything else.
//!
//! Patterns are exact text, globs using the wildcard token (`hello*`,
//! `*morning`, `*bath*`), or the bare wildcard, each compiled once into a
//! regex at load time. Extra header columns become conditions on context
//! fields of the same name.
//!
//! # Example
//!
//! ```rust
//! use rule_brain::{Context, RuleBrain};
//!
//! let mut brain = RuleBrain::new("test-bot");
//! brain
//!     .load_str("pattern,response\nhello,Hi there!\n*,I have no idea how to respond!\n")
//!     .unwrap();
//!
//! let mut ctx = Context::from_message("Hello");
//! assert!(brain.query(&mut ctx).unwrap());
//! assert_eq!(ctx.best_result(), Some("Hi there!"));
//! ```
//!
//! `RuleBrain` also implements [`Brain`], so it can stand in anywhere an
//! AI-backed brain is used.

mod brain;
mod config;
mod context;
mod error;
mod pattern;
mod rule;

pub use brain::RuleBrain;
pub use config::{RuleBrainConfig, RuleBrainConfigBuilder, DEFAULT_BRAIN_ID};
pub use context::{Context, MatchKind, MatchResult, MESSAGE_FIELD};
pub use error::{RuleBrainError, RuleLoadError};
pub use pattern::{normalize, Pattern, PatternKind};
pub use rule::{Condition, LoadOptions, Rule, RuleTable, Specificity, DEFAULT_WILDCARD};

// Re-export brain-core types for convenience
pub use brain_core::{async_trait, Brain, BrainError, InboundMessage, OutboundMessage};
