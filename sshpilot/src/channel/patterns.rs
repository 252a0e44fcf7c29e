//! Expectations: the patterns a wait watches for.

use std::fmt;
use std::ops::Range;

use memchr::memmem;
use regex::bytes::Regex;

/// One entry in an expectation set.
///
/// `Eof` and `Timeout` are pseudo-patterns: when present in the set they turn
/// the corresponding outcome into a regular match instead of an error.
#[derive(Debug, Clone)]
pub enum Expectation {
    /// Literal text, matched byte for byte.
    Exact(String),

    /// A regular expression over the cleaned output.
    Regex(Regex),

    /// The output stream ended.
    Eof,

    /// The wait ran out of time.
    Timeout,
}

impl Expectation {
    pub fn exact(text: impl Into<String>) -> Self {
        Expectation::Exact(text.into())
    }

    /// Compile a regex expectation.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Expectation::Regex(Regex::new(pattern)?))
    }

    /// Locate the first match in `data`.
    ///
    /// Pseudo-patterns never match data.
    pub fn find(&self, data: &[u8]) -> Option<Range<usize>> {
        match self {
            Expectation::Exact(text) if text.is_empty() => Some(0..0),
            Expectation::Exact(text) => {
                memmem::find(data, text.as_bytes()).map(|start| start..start + text.len())
            }
            Expectation::Regex(re) => re.find(data).map(|m| m.range()),
            Expectation::Eof | Expectation::Timeout => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Expectation::Eof)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Expectation::Timeout)
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Exact(text) => write!(f, "{}", text),
            Expectation::Regex(re) => write!(f, "/{}/", re.as_str()),
            Expectation::Eof => write!(f, "<EOF>"),
            Expectation::Timeout => write!(f, "<TIMEOUT>"),
        }
    }
}

impl From<&str> for Expectation {
    fn from(text: &str) -> Self {
        Expectation::exact(text)
    }
}

impl From<Regex> for Expectation {
    fn from(re: Regex) -> Self {
        Expectation::Regex(re)
    }
}

/// Earliest match of any data pattern in `data`.
///
/// Returns the pattern index and match range. When two patterns match at the
/// same offset, the one listed first wins.
pub fn earliest_match(patterns: &[Expectation], data: &[u8]) -> Option<(usize, Range<usize>)> {
    patterns
        .iter()
        .enumerate()
        .filter_map(|(index, pattern)| pattern.find(data).map(|range| (index, range)))
        .min_by_key(|(index, range)| (range.start, *index))
}

/// Result of a successful wait.
#[derive(Debug, Clone)]
pub struct Matched {
    /// Index of the expectation that fired.
    pub index: usize,

    /// Output consumed before the match.
    pub before: Vec<u8>,

    /// The matched text (empty for `Eof`/`Timeout`).
    pub matched: Vec<u8>,
}

impl Matched {
    /// The before buffer as a string (lossy UTF-8).
    pub fn before_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.before)
    }
}
