// src/scan/ignore.rs
// Ordered sets of regular expressions used to skip files and links.

use regex::Regex;

use crate::error::ScanError;

#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    patterns: Vec<Regex>,
}

impl IgnoreRules {
    // Compiles every pattern up front so a typo fails the run before any
    // file is read
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ScanError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern.as_ref()).map_err(|source| ScanError::Pattern {
                    pattern: pattern.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_any_pattern() {
        let rules = IgnoreRules::compile(&["^https://localhost", r"\.png$"]).unwrap();
        assert!(rules.matches("https://localhost:8080/x"));
        assert!(rules.matches("img/logo.png"));
        assert!(!rules.matches("https://example.com"));
    }

    #[test]
    fn test_empty_rules_match_nothing() {
        let rules = IgnoreRules::compile::<&str>(&[]).unwrap();
        assert!(!rules.matches("anything"));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = IgnoreRules::compile(&["(unclosed"]).unwrap_err();
        assert!(matches!(err, ScanError::Pattern { .. }));
    }
}
