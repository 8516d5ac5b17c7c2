//! Rules and the rule table loaded from a delimited file.

use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::context::{Context, MatchKind, MatchResult};
use crate::error::{RuleBrainError, RuleLoadError};
use crate::pattern::{normalize, Pattern};

/// Default match-anything token.
pub const DEFAULT_WILDCARD: &str = "*";

/// Ranking of a rule among other matching rules.
///
/// Compared field by field: declared priority first, then how many literal
/// characters the rule's patterns pin down, then how many pattern ends are
/// anchored.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Specificity {
    pub priority: i64,
    pub literal_chars: usize,
    pub anchors: usize,
}

/// An extra pattern on a named context field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub pattern: Pattern,
}

/// A pattern → response rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    index: usize,
    pattern: Pattern,
    response: String,
    conditions: Vec<Condition>,
    specificity: Specificity,
}

impl Rule {
    /// Build a rule. `index` is its position in the table.
    pub fn new(
        index: usize,
        pattern: Pattern,
        response: impl Into<String>,
        priority: i64,
        conditions: Vec<Condition>,
    ) -> Self {
        // Wildcard conditions constrain nothing.
        let conditions: Vec<Condition> = conditions
            .into_iter()
            .filter(|c| !c.pattern.is_any())
            .collect();

        let patterns = || std::iter::once(&pattern).chain(conditions.iter().map(|c| &c.pattern));
        let specificity = Specificity {
            priority,
            literal_chars: patterns().map(Pattern::literal_chars).sum(),
            anchors: patterns().map(Pattern::anchors).sum(),
        };

        Self {
            index,
            pattern,
            response: response.into(),
            conditions,
            specificity,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// A rule that matches every message and every context.
    pub fn is_wildcard(&self) -> bool {
        self.pattern.is_any() && self.conditions.is_empty()
    }

    /// Test a context whose message has already been normalized.
    fn matches(&self, message: &str, context: &Context) -> bool {
        if !self.pattern.matches(message) {
            return false;
        }
        self.conditions.iter().all(|condition| {
            context
                .field(&condition.field)
                .is_some_and(|value| condition.pattern.matches(&normalize(value)))
        })
    }
}

/// How a rule source is read and its patterns compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Match-anything token inside patterns.
    pub wildcard: String,
    /// Match patterns without case folding.
    pub case_sensitive: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            wildcard: DEFAULT_WILDCARD.to_string(),
            case_sensitive: false,
        }
    }
}

/// Where each rule field lives in a row.
#[derive(Debug)]
struct ColumnLayout {
    pattern: usize,
    response: usize,
    priority: Option<usize>,
    conditions: Vec<(usize, String)>,
}

impl ColumnLayout {
    /// Layout for sources without a header: pattern, response, optional priority.
    fn positional() -> Self {
        Self {
            pattern: 0,
            response: 1,
            priority: Some(2),
            conditions: Vec::new(),
        }
    }

    /// Read a header row: the first two cells must be `pattern` and
    /// `response`. Returns `None` for any other row.
    fn from_header(record: &StringRecord) -> Option<Self> {
        let names: Vec<String> = record.iter().map(|n| n.to_lowercase()).collect();
        if names.len() < 2 || names[0] != "pattern" || names[1] != "response" {
            return None;
        }

        let priority = names.iter().skip(2).position(|n| n == "priority").map(|pos| pos + 2);
        let conditions = names
            .iter()
            .enumerate()
            .skip(2)
            .filter(|(idx, name)| !name.is_empty() && Some(*idx) != priority)
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        Some(Self {
            pattern: 0,
            response: 1,
            priority,
            conditions,
        })
    }

    fn rule(
        &self,
        index: usize,
        row: u64,
        record: &StringRecord,
        options: &LoadOptions,
    ) -> Result<Rule, RuleLoadError> {
        let pattern = record
            .get(self.pattern)
            .ok_or(RuleLoadError::MissingField { row, field: "pattern" })?;

        let response = record
            .get(self.response)
            .filter(|r| !r.is_empty())
            .ok_or(RuleLoadError::MissingField { row, field: "response" })?;

        let priority = match self.priority.and_then(|idx| record.get(idx)) {
            None | Some("") => 0,
            Some(value) => value.parse::<i64>().map_err(|_| RuleLoadError::InvalidField {
                row,
                field: "priority",
                value: value.to_string(),
            })?,
        };

        let compile = |raw: &str, field: &str| {
            Pattern::parse(raw, &options.wildcard, options.case_sensitive).map_err(|source| {
                RuleLoadError::InvalidPattern {
                    row,
                    field: field.to_string(),
                    source,
                }
            })
        };

        let conditions = self
            .conditions
            .iter()
            .map(|(idx, field)| {
                Ok(Condition {
                    field: field.clone(),
                    pattern: compile(record.get(*idx).unwrap_or(""), field)?,
                })
            })
            .collect::<Result<Vec<_>, RuleLoadError>>()?;

        Ok(Rule::new(
            index,
            compile(pattern, "pattern")?,
            response,
            priority,
            conditions,
        ))
    }
}

/// An ordered table of rules, read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: Option<usize>,
    options: LoadOptions,
    fingerprint: Option<String>,
}

impl RuleTable {
    /// An empty table. Every query against it fails with `NoFallbackRule`.
    pub fn empty(options: LoadOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Build a table from rules already in declaration order.
    ///
    /// The first wildcard rule becomes the fallback.
    pub fn from_rules(rules: Vec<Rule>, options: LoadOptions) -> Self {
        let wildcards: Vec<usize> = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_wildcard())
            .map(|(pos, _)| pos)
            .collect();

        if wildcards.len() > 1 {
            warn!(
                "{} wildcard rules declared; using the first (rule {})",
                wildcards.len(),
                wildcards[0]
            );
        }

        Self {
            rules,
            fallback: wildcards.first().copied(),
            options,
            fingerprint: None,
        }
    }

    /// Load a table from a file.
    pub fn from_path(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Self, RuleLoadError> {
        let path = path.as_ref();
        let source = fs::read(path).map_err(|source| RuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_bytes(&source, options)
    }

    /// Load a table from any reader.
    pub fn from_reader<R: Read>(
        mut reader: R,
        options: &LoadOptions,
    ) -> Result<Self, RuleLoadError> {
        let mut source = Vec::new();
        reader
            .read_to_end(&mut source)
            .map_err(RuleLoadError::Read)?;
        Self::parse_bytes(&source, options)
    }

    /// Parse rule source text.
    pub fn parse(text: &str, options: &LoadOptions) -> Result<Self, RuleLoadError> {
        Self::parse_bytes(text.as_bytes(), options)
    }

    /// Parse a rule source, which must be UTF-8.
    ///
    /// Lines starting with `#` are comments. A first row whose first two
    /// cells are `pattern` and `response` is a header; a `priority` column
    /// is read as the rule priority and any other named column becomes a
    /// condition on the context field of the same name.
    pub fn parse_bytes(source: &[u8], options: &LoadOptions) -> Result<Self, RuleLoadError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(options.delimiter)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(source);

        let mut layout: Option<ColumnLayout> = None;
        let mut rules = Vec::new();

        for result in reader.records() {
            let record = result?;
            // whitespace-only line
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            let row = record.position().map_or(0, |p| p.line());

            if layout.is_none() {
                match ColumnLayout::from_header(&record) {
                    Some(header) => {
                        layout = Some(header);
                        continue;
                    }
                    None => layout = Some(ColumnLayout::positional()),
                }
            }
            let Some(columns) = layout.as_ref() else {
                continue;
            };

            let rule = columns.rule(rules.len(), row, &record, options)?;
            debug!("row {}: rule {} -> {:?}", row, rule.index(), rule.pattern().as_str());
            rules.push(rule);
        }

        let mut table = Self::from_rules(rules, options.clone());
        table.fingerprint = Some(
            Sha256::digest(source)
                .iter()
                .map(|byte| format!("{:02x}", byte))
                .collect(),
        );
        Ok(table)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// The effective fallback rule, if the table declares one.
    pub fn fallback(&self) -> Option<&Rule> {
        self.fallback.and_then(|idx| self.rules.get(idx))
    }

    /// Hex SHA-256 of the rule source, for tables that were parsed from one.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Find the best rule for a context without modifying it.
    ///
    /// The most specific matching non-wildcard rule wins; among equally
    /// specific rules the first declared wins. With no match the fallback
    /// rule answers.
    pub fn find_best(&self, context: &Context) -> Result<MatchResult, RuleBrainError> {
        let message = normalize(context.message()?);

        let mut best: Option<&Rule> = None;
        for rule in self.rules.iter().filter(|r| !r.is_wildcard()) {
            if !rule.matches(&message, context) {
                continue;
            }
            if best.map_or(true, |b| rule.specificity > b.specificity) {
                best = Some(rule);
            }
        }

        if let Some(rule) = best {
            debug!("message {:?} matched rule {}", message, rule.index);
            return Ok(MatchResult::from_rule(rule, MatchKind::Rule));
        }

        match self.fallback() {
            Some(rule) => {
                debug!("message {:?} fell back to rule {}", message, rule.index);
                Ok(MatchResult::from_rule(rule, MatchKind::Fallback))
            }
            None => Err(RuleBrainError::NoFallbackRule),
        }
    }

    /// Match a context and record the result on it.
    ///
    /// Returns `true` whenever a result was recorded, fallback included.
    /// On error the context is left unchanged.
    pub fn contains(&self, context: &mut Context) -> Result<bool, RuleBrainError> {
        let result = self.find_best(context)?;
        context.apply(&result);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &str = "\
pattern,response
hello,Hi there! How can I assist you today?
good morning,Good morning! How can I make your day better?
*,I have no idea how to respond!
";

    fn table(text: &str) -> RuleTable {
        RuleTable::parse(text, &LoadOptions::default()).unwrap()
    }

    fn answer(table: &RuleTable, message: &str) -> MatchResult {
        table.find_best(&Context::from_message(message)).unwrap()
    }

    #[test]
    fn test_parse_with_header() {
        let table = table(RULES);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rules()[0].response(), "Hi there! How can I assist you today?");
        assert_eq!(table.fallback().map(Rule::index), Some(2));
        assert!(table.fingerprint().is_some());
    }

    #[test]
    fn test_parse_without_header() {
        let table = table("hello,Hi\n*,Fallback\n");
        assert_eq!(table.len(), 2);
        assert_eq!(answer(&table, "hello").response, "Hi");
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let table = table("# greetings\npattern,response\n\nhello,Hi\n   \n*,Fallback\n");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_quoted_response_with_delimiter() {
        let table = table("hello,\"Hi, friend!\"\n");
        assert_eq!(table.rules()[0].response(), "Hi, friend!");
    }

    #[test]
    fn test_custom_delimiter() {
        let options = LoadOptions {
            delimiter: b';',
            ..LoadOptions::default()
        };
        let table = RuleTable::parse("pattern;response\nhello;Hi, you\n", &options).unwrap();
        assert_eq!(table.rules()[0].response(), "Hi, you");
    }

    #[test]
    fn test_missing_response_names_row() {
        let err = RuleTable::parse("pattern,response\nhello,Hi\nbye\n", &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RuleLoadError::MissingField {
                row: 3,
                field: "response"
            }
        ));
    }

    #[test]
    fn test_empty_response_rejected() {
        let err = RuleTable::parse("hello,\n", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, RuleLoadError::MissingField { field: "response", .. }));
    }

    #[test]
    fn test_headerless_row_mentioning_column_names() {
        let table = table("what do you match,pattern\n*,fallback\n");
        assert_eq!(table.len(), 2);
        assert_eq!(answer(&table, "What do you match").response, "pattern");
    }

    #[test]
    fn test_header_only_when_first_two_cells_match() {
        // column names in the wrong order are ordinary rule text
        let swapped = table("response,pattern\n*,fallback\n");
        assert_eq!(swapped.len(), 2);
        assert_eq!(answer(&swapped, "response").response, "pattern");

        let table = table("Pattern,Response,Priority\nhi,Hello,3\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.rules()[0].specificity().priority, 3);
    }

    #[test]
    fn test_delimiter_only_row_rejected() {
        let err = RuleTable::parse("pattern,response\nhello,Hi\n,\n*,fb\n", &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RuleLoadError::MissingField {
                row: 3,
                field: "response"
            }
        ));

        let err = RuleTable::parse("hello,Hi\n,,\n", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, RuleLoadError::MissingField { field: "response", .. }));
    }

    #[test]
    fn test_invalid_utf8_is_csv_error() {
        let source = b"pattern,response\nhello,Hi \xff\xfe there\n";
        let err = RuleTable::parse_bytes(source, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, RuleLoadError::Csv(_)));
    }

    #[test]
    fn test_from_reader() {
        let source = std::io::Cursor::new(RULES.as_bytes());
        let table = RuleTable::from_reader(source, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(answer(&table, "good morning").rule_index, 1);
    }

    #[test]
    fn test_fingerprint_tracks_source() {
        let first = table(RULES);
        let again = table(RULES);
        let changed = table("hello,Hey\n*,?\n");

        assert_eq!(first.fingerprint(), again.fingerprint());
        assert_ne!(first.fingerprint(), changed.fingerprint());
        assert_eq!(first.fingerprint().map(str::len), Some(64));
        assert!(RuleTable::empty(LoadOptions::default()).fingerprint().is_none());
    }

    #[test]
    fn test_regex_special_characters_in_rules() {
        let table = table("what's 2+2?,Four\n(*),Parenthetical\n*,?\n");
        assert_eq!(answer(&table, "What's 2+2?").response, "Four");
        assert_eq!(answer(&table, "(aside)").response, "Parenthetical");
        assert!(answer(&table, "whats 22").is_fallback());
    }

    #[test]
    fn test_invalid_priority() {
        let err = RuleTable::parse("hello,Hi,high\n", &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            RuleLoadError::InvalidField {
                row: 1,
                field: "priority",
                ..
            }
        ));
    }

    #[test]
    fn test_exact_and_fallback() {
        let table = table(RULES);
        let result = answer(&table, "Hello");
        assert_eq!(result.response, "Hi there! How can I assist you today?");
        assert_eq!(result.kind, MatchKind::Rule);

        let result = answer(&table, "Where is the bathroom?");
        assert_eq!(result.response, "I have no idea how to respond!");
        assert_eq!(result.kind, MatchKind::Fallback);
    }

    #[test]
    fn test_more_specific_rule_wins() {
        let table = table("*morning*,Morning!\ngood morning*,Good morning to you!\n*,?\n");
        assert_eq!(answer(&table, "good morning team").response, "Good morning to you!");
        assert_eq!(answer(&table, "what a morning").response, "Morning!");
    }

    #[test]
    fn test_exact_beats_prefix_of_same_length() {
        let table = table("hello*,prefix\nhello,exact\n");
        assert_eq!(answer(&table, "hello").response, "exact");
        assert_eq!(answer(&table, "hello you").response, "prefix");
    }

    #[test]
    fn test_first_declared_wins_tie() {
        let table = table("*cat*,first\n*dog*,second\n*,none\n");
        // both patterns have equal specificity
        for _ in 0..3 {
            assert_eq!(answer(&table, "cat and dog").response, "first");
        }
    }

    #[test]
    fn test_priority_outranks_length() {
        let table = table(
            "pattern,response,priority\n*help*,Priority help,10\n*help me please*,Long help,\n",
        );
        assert_eq!(answer(&table, "help me please").response, "Priority help");
    }

    #[test]
    fn test_first_wildcard_is_fallback() {
        let table = table("*,first fallback\n,second fallback\nhi,Hi\n");
        assert_eq!(table.fallback().map(Rule::index), Some(0));
        assert_eq!(answer(&table, "unknown").response, "first fallback");
    }

    #[test]
    fn test_condition_columns() {
        let table = table("pattern,response,sender\nhello,Hi boss,+1555*\nhello,Hi,*\n*,?,\n");

        let boss =
            Context::from_value(json!({"message": "hello", "sender": "+15551234567"})).unwrap();
        assert_eq!(table.find_best(&boss).unwrap().response, "Hi boss");

        let other = Context::from_value(json!({"message": "hello", "sender": "+4400"})).unwrap();
        assert_eq!(table.find_best(&other).unwrap().response, "Hi");

        // A missing field only satisfies wildcard conditions.
        assert_eq!(answer(&table, "hello").response, "Hi");
    }

    #[test]
    fn test_no_fallback() {
        let empty = RuleTable::empty(LoadOptions::default());
        assert!(matches!(
            empty.find_best(&Context::from_message("hi")),
            Err(RuleBrainError::NoFallbackRule)
        ));

        let table = table("hello,Hi\n");
        assert!(matches!(
            table.find_best(&Context::from_message("bye")),
            Err(RuleBrainError::NoFallbackRule)
        ));
    }

    #[test]
    fn test_contains_records_result() {
        let table = table(RULES);
        let mut ctx = Context::from_message("good morning");

        assert!(table.contains(&mut ctx).unwrap());
        assert_eq!(ctx.best_result(), Some("Good morning! How can I make your day better?"));
        assert_eq!(ctx.matched_rule(), Some(1));
    }
}
