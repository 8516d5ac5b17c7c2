//! Message patterns: exact text, globs, and the match-anything wildcard.
//!
//! Each pattern is compiled once into an anchored [`Regex`]: literal text is
//! escaped, every wildcard token becomes `.*`, and `(?i)` is prepended for
//! case-insensitive matching. Messages are compared after whitespace
//! normalization (trimmed, inner runs collapsed to a single space).

use regex::Regex;

/// Collapse whitespace so that spacing differences never affect a match.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The shape of a compiled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Matches any text.
    Any,
    /// Matches only the pattern text itself.
    Exact,
    /// Literal segments separated by wildcards.
    Glob,
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: PatternKind,
    text: String,
    regex: Option<Regex>,
    literal_chars: usize,
    anchors: usize,
}

impl Pattern {
    /// The match-anything pattern.
    pub fn any() -> Self {
        Self {
            kind: PatternKind::Any,
            text: String::new(),
            regex: None,
            literal_chars: 0,
            anchors: 0,
        }
    }

    /// Compile `raw` using `wildcard` as the match-anything token.
    ///
    /// An empty cell, or one consisting only of wildcards, compiles to the
    /// match-anything pattern.
    pub fn parse(raw: &str, wildcard: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        let text = normalize(raw);
        let wildcard = normalize(wildcard);

        let parts: Vec<&str> = if wildcard.is_empty() {
            vec![text.as_str()]
        } else {
            text.split(wildcard.as_str()).collect()
        };
        if parts.iter().all(|p| p.is_empty()) {
            return Ok(Self::any());
        }

        let kind = if parts.len() == 1 {
            PatternKind::Exact
        } else {
            PatternKind::Glob
        };
        let anchors = parts.first().map_or(0, |p| usize::from(!p.is_empty()))
            + parts.last().map_or(0, |p| usize::from(!p.is_empty()));
        let literal_chars = parts.iter().map(|p| p.chars().count()).sum();

        let body = parts
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join(".*");
        let flags = if case_sensitive { "" } else { "(?i)" };
        let regex = Regex::new(&format!("{}^{}$", flags, body))?;

        Ok(Self {
            kind,
            text,
            regex: Some(regex),
            literal_chars,
            anchors,
        })
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// The normalized pattern text as written in the rules source.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether this pattern matches anything.
    pub fn is_any(&self) -> bool {
        self.kind == PatternKind::Any
    }

    /// Test whitespace-normalized `text` against the pattern.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(text))
    }

    /// Number of literal characters the pattern pins down.
    pub fn literal_chars(&self) -> usize {
        self.literal_chars
    }

    /// Number of pattern ends tied to the ends of the text.
    pub fn anchors(&self) -> usize {
        self.anchors
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.regex.as_ref().map(Regex::as_str) == other.regex.as_ref().map(Regex::as_str)
    }
}

impl Eq for Pattern {}
