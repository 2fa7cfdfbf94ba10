//! Rule-based text rewrites: matchers, stopword filters and stemmers.

use ahash::AHashSet;
use regex::Regex;

use crate::analysis::encoder::Encoder;
use crate::error::{LotusError, Result};

/// A single pattern substitution.
#[derive(Debug, Clone)]
struct ReplaceRule {
    pattern: Regex,
    replacement: String,
}

/// Ordered pattern → replacement substitutions applied before encoding.
#[derive(Debug, Clone, Default)]
pub struct MatcherRules {
    rules: Vec<ReplaceRule>,
}

impl MatcherRules {
    /// Compile a list of (regex pattern, replacement) pairs.
    pub fn compile(pairs: &[(String, String)]) -> Result<Self> {
        let rules = pairs
            .iter()
            .map(|(pattern, replacement)| {
                let pattern = Regex::new(pattern).map_err(|e| {
                    LotusError::invalid_argument(format!("invalid matcher pattern '{pattern}': {e}"))
                })?;
                Ok(ReplaceRule {
                    pattern,
                    replacement: replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MatcherRules { rules })
    }

    /// Apply every rule in order.
    pub fn apply(&self, text: &str) -> String {
        let mut value = text.to_string();
        for rule in &self.rules {
            value = rule
                .pattern
                .replace_all(&value, rule.replacement.as_str())
                .into_owned();
        }
        value
    }

    /// Append the rules of another set.
    pub fn extend(&mut self, other: MatcherRules) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Drops stopwords from encoded text.
#[derive(Debug, Clone, Default)]
pub struct StopwordFilter {
    words: AHashSet<String>,
}

impl StopwordFilter {
    /// Build a filter, running each stopword through the index encoder so
    /// that it matches encoded text.
    pub fn new(words: &[String], encoder: Option<&dyn Encoder>) -> Result<Self> {
        let mut set = AHashSet::with_capacity(words.len());
        for word in words {
            let encoded = match encoder {
                Some(encoder) => encoder.encode(word)?,
                None => word.clone(),
            };
            if !encoded.is_empty() {
                set.insert(encoded);
            }
        }
        Ok(StopwordFilter { words: set })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn apply(&self, text: &str) -> String {
        text.split(' ')
            .filter(|word| !self.words.contains(*word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Suffix rewrite rules.
///
/// A rule only fires on words at least three characters longer than its
/// suffix, and the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct Stemmer {
    rules: Vec<(String, String)>,
}

impl Stemmer {
    /// Build a stemmer; suffixes and replacements go through the index
    /// encoder so they line up with encoded text.
    pub fn new(rules: &[(String, String)], encoder: Option<&dyn Encoder>) -> Result<Self> {
        let mut encoded = Vec::with_capacity(rules.len());
        for (suffix, replacement) in rules {
            let pair = match encoder {
                Some(encoder) => (encoder.encode(suffix)?, encoder.encode(replacement)?),
                None => (suffix.clone(), replacement.clone()),
            };
            if !pair.0.is_empty() {
                encoded.push(pair);
            }
        }
        Ok(Stemmer { rules: encoded })
    }

    /// Stem a single word.
    pub fn stem(&self, word: &str) -> String {
        let length = word.chars().count();
        for (suffix, replacement) in &self.rules {
            if length >= suffix.chars().count() + 3 {
                if let Some(stem) = word.strip_suffix(suffix.as_str()) {
                    return format!("{stem}{replacement}");
                }
            }
        }
        word.to_string()
    }

    /// Stem every space-separated word of the text.
    pub fn apply(&self, text: &str) -> String {
        text.split(' ')
            .map(|word| self.stem(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::encoder::BuiltinEncoder;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_matcher_applies_in_order() {
        let rules = MatcherRules::compile(&pairs(&[("colour", "color"), ("or$", "or!")])).unwrap();
        assert_eq!(rules.apply("colour"), "color!");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_matcher_rejects_bad_pattern() {
        let err = MatcherRules::compile(&pairs(&[("(", "x")])).unwrap_err();
        assert!(matches!(err, LotusError::InvalidArgument(_)));
    }

    #[test]
    fn test_stopword_filter() {
        let words = vec!["The".to_string(), "of".to_string()];
        let filter = StopwordFilter::new(&words, Some(&BuiltinEncoder::Icase)).unwrap();
        assert!(filter.contains("the"));
        assert_eq!(filter.apply("the state of the art"), "state art");
    }

    #[test]
    fn test_stemmer_respects_min_length() {
        let stemmer = Stemmer::new(&pairs(&[("ing", ""), ("ies", "y")]), None).unwrap();
        assert_eq!(stemmer.stem("running"), "runn");
        assert_eq!(stemmer.stem("ponies"), "pony");
        // too short for the suffix rule
        assert_eq!(stemmer.stem("sing"), "sing");
        assert_eq!(stemmer.apply("flies ring jumping"), "flies ring jump");
    }
}
