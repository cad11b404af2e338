//! Content patterns and message-type filters.
//!
//! A [`Pattern`] gates listeners and middleware steps: a wildcard, a single
//! case-insensitive expression, or an any-of set (logical OR). Matching is
//! stateless; a compiled pattern yields the same verdict however many times
//! it is tested.
//!
//! A [`TypeFilter`] restricts listeners to a set of target types. Input is
//! case-folded and comma-split; the empty filter accepts every type.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// A content pattern tested against an envelope's textual content.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches every envelope.
    Always,
    /// Matches nothing.
    Never,
    /// A single case-insensitive expression.
    Regex(Regex),
    /// An any-of set; succeeds if at least one expression matches.
    Any(Vec<Regex>),
}

impl Pattern {
    /// Compiles a single pattern string, case-insensitively.
    pub fn compile(pattern: &str) -> Result<Self> {
        Ok(Self::Regex(compile(pattern)?))
    }

    /// Compiles an any-of set of pattern strings.
    pub fn any<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut expressions = Vec::new();
        for pattern in patterns {
            expressions.push(compile(pattern.as_ref())?);
        }
        Ok(Self::Any(expressions))
    }

    /// The wildcard pattern: `true` matches everything, `false` nothing.
    pub fn wildcard(enabled: bool) -> Self {
        if enabled { Self::Always } else { Self::Never }
    }

    /// Tests the pattern against envelope content.
    ///
    /// Missing content only satisfies the wildcard.
    pub fn matches(&self, content: Option<&str>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Regex(expression) => content.is_some_and(|c| expression.is_match(c)),
            Self::Any(expressions) => {
                content.is_some_and(|c| expressions.iter().any(|e| e.is_match(c)))
            }
        }
    }
}

impl From<bool> for Pattern {
    fn from(enabled: bool) -> Self {
        Self::wildcard(enabled)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// A set of accepted target types for a listener.
#[derive(Debug, Clone, Default)]
pub struct TypeFilter {
    accepted: HashSet<String>,
}

impl TypeFilter {
    /// Accepts every message type.
    pub fn any() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list; entries are trimmed and case-folded.
    pub fn parse(input: &str) -> Self {
        let accepted = input
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { accepted }
    }

    /// Builds a filter from individual type names.
    pub fn of<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let accepted = types
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { accepted }
    }

    /// Whether the filter accepts every type.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Tests a target type. The empty filter accepts everything, including
    /// envelopes with no target type at all.
    pub fn accepts(&self, kind: Option<&str>) -> bool {
        if self.accepted.is_empty() {
            return true;
        }
        kind.is_some_and(|k| self.accepted.contains(&k.to_lowercase()))
    }
}

impl From<&str> for TypeFilter {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_patterns_match_case_insensitively() {
        let pattern = Pattern::compile("ping").unwrap();
        assert!(pattern.matches(Some("PING")));
        assert!(pattern.matches(Some("who said Ping?")));
        assert!(!pattern.matches(Some("pong")));
    }

    #[test]
    fn repeated_tests_are_stable() {
        // The original implementation had to reset regex cursor state
        // between tests; ours must give identical verdicts on every call.
        let pattern = Pattern::compile("ping").unwrap();
        for _ in 0..4 {
            assert!(pattern.matches(Some("ping")));
            assert!(!pattern.matches(Some("nope")));
        }
    }

    #[test]
    fn any_of_matches_when_either_pattern_does() {
        let pattern = Pattern::any(["hello", "bye"]).unwrap();
        assert!(pattern.matches(Some("Hello there")));
        assert!(pattern.matches(Some("goodBYE")));
        assert!(!pattern.matches(Some("nothing")));
    }

    #[test]
    fn wildcard_matches_even_without_content() {
        assert!(Pattern::Always.matches(None));
        assert!(!Pattern::Never.matches(Some("anything")));
        assert!(!Pattern::compile("x").unwrap().matches(None));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Pattern::compile("(unclosed").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn type_filter_normalizes_comma_separated_input() {
        let filter = TypeFilter::parse(" Group , PRIVATE ");
        assert!(filter.accepts(Some("group")));
        assert!(filter.accepts(Some("Private")));
        assert!(!filter.accepts(Some("channel")));
        assert!(!filter.accepts(None));
    }

    #[test]
    fn empty_type_filter_accepts_everything() {
        let filter = TypeFilter::any();
        assert!(filter.accepts(Some("Group")));
        assert!(filter.accepts(None));
    }
}
