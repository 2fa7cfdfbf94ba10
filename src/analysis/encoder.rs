//! Text encoders applied to documents and queries before tokenization.
//!
//! An encoder normalizes raw text into the form that gets tokenized and
//! indexed. The built-in encoders range from a plain lowercase fold to a
//! phonetic transformation that trades precision for typo tolerance.

use std::fmt::Debug;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Capability interface for text normalization.
///
/// Implementations must be deterministic: the same pipeline is applied to
/// documents at index time and to queries at search time.
pub trait Encoder: Send + Sync + Debug {
    /// Encode the given text.
    fn encode(&self, text: &str) -> Result<String>;

    /// Name of this encoder, used in diagnostics.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Encoder selection in an index configuration.
///
/// Named encoders are looked up in the [`Registry`](super::registry::Registry)
/// the index is built with; built-in encoders are registered under
/// `icase`, `simple`, `advanced`, `extra` and `balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncoderKind {
    /// An encoder registered under this name.
    Named(String),
    /// A user-supplied encoder.
    #[serde(skip)]
    Custom(Arc<dyn Encoder>),
}

impl EncoderKind {
    /// Refer to a registered encoder by name.
    pub fn named<S: Into<String>>(name: S) -> Self {
        EncoderKind::Named(name.into())
    }

    /// Wrap a user-supplied encoder.
    pub fn custom<E: Encoder + 'static>(encoder: E) -> Self {
        EncoderKind::Custom(Arc::new(encoder))
    }
}

impl From<&str> for EncoderKind {
    fn from(name: &str) -> Self {
        EncoderKind::named(name)
    }
}

impl From<BuiltinEncoder> for EncoderKind {
    fn from(encoder: BuiltinEncoder) -> Self {
        EncoderKind::named(encoder.name())
    }
}

/// The encoders that ship with Lotus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinEncoder {
    /// Case-insensitive matching.
    Icase,
    /// Literal normalization: accents, punctuation and whitespace.
    Simple,
    /// Literal transformation of common letter pairs on top of `Simple`.
    Advanced,
    /// Phonetic transformation on top of `Advanced`.
    Extra,
    /// Lightweight normalization with repeated-char collapsing.
    Balance,
}

impl BuiltinEncoder {
    /// All built-in encoders.
    pub const ALL: [BuiltinEncoder; 5] = [
        BuiltinEncoder::Icase,
        BuiltinEncoder::Simple,
        BuiltinEncoder::Advanced,
        BuiltinEncoder::Extra,
        BuiltinEncoder::Balance,
    ];

    /// Look up a built-in encoder by its registry name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    /// Registry name of this encoder.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinEncoder::Icase => "icase",
            BuiltinEncoder::Simple => "simple",
            BuiltinEncoder::Advanced => "advanced",
            BuiltinEncoder::Extra => "extra",
            BuiltinEncoder::Balance => "balance",
        }
    }

    /// Apply this encoder.
    pub fn apply(&self, text: &str) -> String {
        match self {
            BuiltinEncoder::Icase => text.to_lowercase(),
            BuiltinEncoder::Simple => encode_simple(text),
            BuiltinEncoder::Advanced => encode_advanced(text, false),
            BuiltinEncoder::Extra => encode_extra(text),
            BuiltinEncoder::Balance => encode_balance(text),
        }
    }
}

impl Encoder for BuiltinEncoder {
    fn encode(&self, text: &str) -> Result<String> {
        Ok(self.apply(text))
    }

    fn name(&self) -> &str {
        BuiltinEncoder::name(self)
    }
}

lazy_static! {
    static ref MULTI_WHITESPACE: Regex = Regex::new(r"\s\s+").unwrap();
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9 ]").unwrap();
    static ref WORD_JOINERS: Regex = Regex::new(r"[-/]").unwrap();
    static ref AMPERSAND: Regex = Regex::new(r" & ").unwrap();
    static ref ACCENTS: Vec<(Regex, &'static str)> = vec![
        (Regex::new("[àáâãäå]").unwrap(), "a"),
        (Regex::new("[èéêë]").unwrap(), "e"),
        (Regex::new("[ìíîï]").unwrap(), "i"),
        (Regex::new("[òóôõöő]").unwrap(), "o"),
        (Regex::new("[ùúûüű]").unwrap(), "u"),
        (Regex::new("[ýŷÿ]").unwrap(), "y"),
        (Regex::new("ñ").unwrap(), "n"),
        (Regex::new("ç").unwrap(), "c"),
        (Regex::new("ß").unwrap(), "s"),
    ];
}

/// Letter pairs rewritten by the `advanced` encoder, applied in order.
const LETTER_PAIRS: [(&str, &str); 17] = [
    ("ae", "a"),
    ("ai", "ei"),
    ("ay", "ei"),
    ("ey", "ei"),
    ("oe", "o"),
    ("ue", "u"),
    ("ie", "i"),
    ("sz", "s"),
    ("zs", "s"),
    ("sh", "s"),
    ("ck", "k"),
    ("cc", "k"),
    ("dt", "t"),
    ("ph", "f"),
    ("pf", "f"),
    ("ou", "o"),
    ("uo", "u"),
];

/// Returns true for the characters treated as vowels throughout Lotus.
pub fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

fn encode_simple(text: &str) -> String {
    let mut value = text.to_lowercase();
    for (pattern, replacement) in ACCENTS.iter() {
        value = pattern.replace_all(&value, *replacement).into_owned();
    }
    value = AMPERSAND.replace_all(&value, " and ").into_owned();
    value = WORD_JOINERS.replace_all(&value, " ").into_owned();
    value = NON_ALNUM.replace_all(&value, "").into_owned();
    value = MULTI_WHITESPACE.replace_all(&value, " ").into_owned();

    if value == " " { String::new() } else { value }
}

fn encode_advanced(text: &str, skip_collapse: bool) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut value = encode_simple(text);
    if value.chars().count() > 2 {
        for (pair, replacement) in LETTER_PAIRS {
            value = value.replace(pair, replacement);
        }
    }

    if !skip_collapse && value.chars().count() > 1 {
        value = collapse_repeating_chars(&value);
    }
    value
}

fn encode_extra(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let value = encode_advanced(text, true);
    if value.chars().count() <= 1 {
        return value;
    }

    let words: Vec<String> = value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if word.chars().count() > 1 => {
                    let mut encoded = String::with_capacity(word.len());
                    encoded.push(first);
                    encoded.extend(chars.filter_map(soundex));
                    encoded
                }
                _ => word.to_string(),
            }
        })
        .collect();

    collapse_repeating_chars(&words.join(" "))
}

/// Phonetic substitution used by the `extra` encoder; vowels are dropped.
fn soundex(c: char) -> Option<char> {
    match c {
        'p' => Some('b'),
        'z' => Some('s'),
        'c' | 'g' | 'q' => Some('k'),
        'n' => Some('m'),
        'd' => Some('t'),
        'v' | 'w' => Some('f'),
        c if is_vowel(c) => None,
        c => Some(c),
    }
}

fn encode_balance(text: &str) -> String {
    let mut value = text.to_lowercase();
    value = WORD_JOINERS.replace_all(&value, " ").into_owned();
    value = NON_ALNUM.replace_all(&value, "").into_owned();
    value = MULTI_WHITESPACE.replace_all(&value, " ").into_owned();
    collapse_repeating_chars(&value)
}

/// Collapse runs of the same character into one.
///
/// An `h` is also dropped unless it starts the text, follows a space, or sits
/// between two vowels.
pub fn collapse_repeating_chars(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut collapsed = String::with_capacity(text.len());
    let mut prev: Option<char> = None;

    for (i, &c) in chars.iter().enumerate() {
        if Some(c) != prev {
            if i > 0 && c == 'h' {
                let prev_vowel = prev.is_some_and(is_vowel);
                let next_vowel = chars.get(i + 1).copied().is_some_and(is_vowel);
                if (prev_vowel && next_vowel) || prev == Some(' ') {
                    collapsed.push(c);
                }
            } else {
                collapsed.push(c);
            }
        }
        prev = Some(c);
    }

    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icase() {
        assert_eq!(BuiltinEncoder::Icase.apply("Hello World"), "hello world");
    }

    #[test]
    fn test_simple_folds_accents_and_punctuation() {
        assert_eq!(BuiltinEncoder::Simple.apply("Crème Brûlée!"), "creme brulee");
        assert_eq!(BuiltinEncoder::Simple.apply("salt & pepper"), "salt and pepper");
        assert_eq!(BuiltinEncoder::Simple.apply("red-green/blue"), "red green blue");
        assert_eq!(BuiltinEncoder::Simple.apply("a    b"), "a b");
        assert_eq!(BuiltinEncoder::Simple.apply("?"), "");
    }

    #[test]
    fn test_advanced_rewrites_pairs() {
        assert_eq!(BuiltinEncoder::Advanced.apply("phone"), "fone");
        assert_eq!(BuiltinEncoder::Advanced.apply("check"), "cek");
        assert_eq!(BuiltinEncoder::Advanced.apply("ab"), "ab");
    }

    #[test]
    fn test_extra_is_phonetic() {
        // Both spellings collapse onto the same code.
        let a = BuiltinEncoder::Extra.apply("Philipp");
        let b = BuiltinEncoder::Extra.apply("Filip");
        assert_eq!(a, b);
        assert_eq!(BuiltinEncoder::Extra.apply("x"), "x");
    }

    #[test]
    fn test_balance() {
        assert_eq!(BuiltinEncoder::Balance.apply("Hello-World"), "helo world");
    }

    #[test]
    fn test_collapse_repeating_chars() {
        assert_eq!(collapse_repeating_chars("aabbcc"), "abc");
        assert_eq!(collapse_repeating_chars("hello"), "helo");
        // h is kept at the start, after a space and between vowels
        assert_eq!(collapse_repeating_chars("hat hen"), "hat hen");
        assert_eq!(collapse_repeating_chars("aha"), "aha");
        assert_eq!(collapse_repeating_chars("thin"), "tin");
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(BuiltinEncoder::from_name("extra"), Some(BuiltinEncoder::Extra));
        assert_eq!(BuiltinEncoder::from_name("nope"), None);
    }

    #[test]
    fn test_encoder_kind_serde() {
        let kind: EncoderKind = serde_json::from_str("\"balance\"").unwrap();
        assert!(matches!(kind, EncoderKind::Named(ref n) if n == "balance"));
    }
}
