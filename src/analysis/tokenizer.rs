//! Tokenization modes.
//!
//! A [`TokenizeMode`] does two jobs. It splits encoded text into an ordered
//! sequence of words, and at index time it expands each word into the
//! fragments that get posted, each with a partial score telling how much of
//! the parent word the fragment represents.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::encoder::is_vowel;
use crate::error::Result;

/// Capability interface for user-supplied tokenizers.
///
/// Tokens produced by a custom tokenizer are indexed as whole words.
pub trait Tokenizer: Send + Sync + Debug {
    /// Split encoded text into tokens. Empty tokens are allowed and skipped.
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Name of this tokenizer.
    fn name(&self) -> &str {
        "custom"
    }
}

/// A token fragment produced from a word at index time.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// The posted token.
    pub token: String,
    /// How much of the parent word this fragment covers, in `(0, 1]`.
    pub partial_score: f64,
}

impl Fragment {
    fn new(token: String, partial_score: f64) -> Self {
        Fragment {
            token,
            partial_score,
        }
    }
}

/// Tokenization strategy of an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizeMode {
    /// Whole words split on a fixed delimiter set.
    Strict,
    /// Dynamic pseudo-syllable segmentation.
    #[default]
    Ngram,
    /// Every left-anchored prefix of each word.
    Forward,
    /// Every right-anchored suffix plus every prefix of each word.
    Reverse,
    /// Alias of `Reverse`.
    Both,
    /// Every contiguous substring of each word.
    Full,
    /// A user-supplied tokenizer.
    #[serde(skip)]
    Custom(Arc<dyn Tokenizer>),
}

impl TokenizeMode {
    /// Wrap a user-supplied tokenizer.
    pub fn custom<T: Tokenizer + 'static>(tokenizer: T) -> Self {
        TokenizeMode::Custom(Arc::new(tokenizer))
    }

    /// Name of this mode.
    pub fn name(&self) -> &str {
        match self {
            TokenizeMode::Strict => "strict",
            TokenizeMode::Ngram => "ngram",
            TokenizeMode::Forward => "forward",
            TokenizeMode::Reverse => "reverse",
            TokenizeMode::Both => "both",
            TokenizeMode::Full => "full",
            TokenizeMode::Custom(tokenizer) => tokenizer.name(),
        }
    }

    /// Whether this mode indexes whole words only.
    ///
    /// Only whole-word modes populate the context index.
    pub fn is_whole_word(&self) -> bool {
        matches!(
            self,
            TokenizeMode::Strict | TokenizeMode::Ngram | TokenizeMode::Custom(_)
        )
    }

    /// Split encoded text into words.
    pub fn split_words(&self, text: &str) -> Result<Vec<String>> {
        match self {
            TokenizeMode::Ngram => Ok(ngram(text)),
            TokenizeMode::Custom(tokenizer) => tokenizer.tokenize(text),
            _ => Ok(split_strict(text)),
        }
    }

    /// Expand a word into the fragments posted for it.
    pub fn fragments(&self, word: &str) -> Vec<Fragment> {
        let chars: Vec<char> = word.chars().collect();
        let length = chars.len() as f64;

        match self {
            TokenizeMode::Forward => prefixes(&chars),
            TokenizeMode::Reverse | TokenizeMode::Both => {
                let mut fragments: Vec<Fragment> = (1..chars.len())
                    .rev()
                    .map(|start| {
                        let suffix: String = chars[start..].iter().collect();
                        Fragment::new(suffix, (chars.len() - start) as f64 / length)
                    })
                    .collect();
                fragments.extend(prefixes(&chars));
                fragments
            }
            TokenizeMode::Full => {
                let mut fragments = Vec::new();
                for start in 0..chars.len() {
                    let partial_score = (chars.len() - start) as f64 / length;
                    for end in (start + 1..=chars.len()).rev() {
                        let token: String = chars[start..end].iter().collect();
                        fragments.push(Fragment::new(token, partial_score));
                    }
                }
                fragments
            }
            _ => vec![Fragment::new(word.to_string(), 1.0)],
        }
    }
}

fn prefixes(chars: &[char]) -> Vec<Fragment> {
    let length = chars.len() as f64;
    (1..=chars.len())
        .map(|end| {
            let prefix: String = chars[..end].iter().collect();
            Fragment::new(prefix, end as f64 / length)
        })
        .collect()
}

/// Delimiters of the strict split: whitespace and the ASCII range from
/// space to `/`, which covers `-` and `/`.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || (' '..='/').contains(&c)
}

/// Split text on the strict delimiter set.
///
/// Consecutive delimiters leave empty words behind so that word positions
/// stay stable; the index skips them.
pub fn split_strict(text: &str) -> Vec<String> {
    text.split(is_delimiter).map(String::from).collect()
}

/// Segment text into pseudo-syllable parts.
///
/// Each whitespace-separated word is walked left to right while vowels and
/// other characters are counted. A run is closed when it holds enough of both
/// (the required counts depend on whether the word is longer than eight
/// characters) or at the end of the word. A closed run longer than two
/// characters starts a new part; shorter runs are glued onto the current one.
/// Every word starts a new part.
pub fn ngram(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for word in text.split_whitespace() {
        segment_word(word, &mut parts);
    }
    parts
}

fn segment_word(word: &str, parts: &mut Vec<String>) {
    let chars: Vec<char> = word.chars().collect();
    let long_word = chars.len() > 8;

    let mut vowels = 0;
    let mut others = 0;
    let mut run = String::new();
    let mut current: Option<String> = None;

    for (i, &c) in chars.iter().enumerate() {
        if is_vowel(c) {
            vowels += 1;
        } else {
            others += 1;
        }
        run.push(c);

        let boundary = (vowels >= if long_word { 1 } else { 2 } && others >= 2)
            || (vowels >= 2 && others >= if long_word { 2 } else { 1 })
            || i == chars.len() - 1;

        if boundary {
            if current.is_some() && run.chars().count() <= 2 {
                if let Some(part) = current.as_mut() {
                    part.push_str(&run);
                }
                run.clear();
            } else if let Some(done) = current.replace(std::mem::take(&mut run)) {
                parts.push(done);
            }
            vowels = 0;
            others = 0;
        }
    }

    if let Some(part) = current {
        parts.push(part);
    }
}
