//! Search filter over task names.
//!
//! User input is untrusted: it is either escaped or compiled under a size
//! limit, and a pattern that fails to compile matches nothing.

use regex::{Regex, RegexBuilder};
use tasklist_core::{PatternError, SearchMode};

use crate::task::Task;

const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Case-insensitive name matcher.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Option<Regex>,
}

impl Matcher {
    /// Compile `pattern` according to `mode`.
    pub fn compile(pattern: &str, mode: SearchMode) -> Result<Self, PatternError> {
        let source = match mode {
            SearchMode::Regex => pattern.to_string(),
            SearchMode::Literal => regex::escape(pattern),
        };

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternError::new(pattern, e.to_string()))?;

        Ok(Self { regex: Some(regex) })
    }

    /// A matcher that rejects every name.
    pub fn nothing() -> Self {
        Self { regex: None }
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(name))
    }
}

/// Tasks from `reference` whose name matches, in reference order.
pub fn filter_tasks(reference: &[Task], matcher: &Matcher) -> Vec<Task> {
    reference
        .iter()
        .filter(|t| matcher.is_match(&t.name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Vec<Task> {
        vec![
            Task::new("1", "Buy milk", false),
            Task::new("2", "walk dog", true),
            Task::new("3", "buy bread (2x)", false),
        ]
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let matcher = Matcher::compile("", SearchMode::Regex).unwrap();
        assert_eq!(filter_tasks(&reference(), &matcher), reference());
    }

    #[test]
    fn test_case_insensitive_in_reference_order() {
        let matcher = Matcher::compile("BUY", SearchMode::Regex).unwrap();
        let names: Vec<_> = filter_tasks(&reference(), &matcher)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Buy milk", "buy bread (2x)"]);
    }

    #[test]
    fn test_regex_mode_supports_expressions() {
        let matcher = Matcher::compile("^walk|milk$", SearchMode::Regex).unwrap();
        assert_eq!(filter_tasks(&reference(), &matcher).len(), 2);
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let err = Matcher::compile("(2x", SearchMode::Regex).unwrap_err();
        assert_eq!(err.pattern, "(2x");
    }

    #[test]
    fn test_literal_mode_escapes_input() {
        let matcher = Matcher::compile("(2x", SearchMode::Literal).unwrap();
        let found = filter_tasks(&reference(), &matcher);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_deref(), Some("3"));
    }

    #[test]
    fn test_nothing_matches_nothing() {
        assert!(filter_tasks(&reference(), &Matcher::nothing()).is_empty());
    }
}
