use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::analysis::encoder::{BuiltinEncoder, Encoder, EncoderKind};
use crate::analysis::pipeline::EncodePipeline;
use crate::analysis::registry::Registry;
use crate::analysis::rules::{MatcherRules, Stemmer, StopwordFilter};
use crate::analysis::tokenizer::TokenizeMode;
use crate::error::{LotusError, Result};
use crate::lexical::scoring::MAX_BUCKET;

/// Named bundles of encoder, mode, threshold and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Memory,
    Speed,
    Match,
    Score,
    Balance,
    Fastest,
}

/// The options a [`Profile`] sets.
#[derive(Debug, Clone)]
pub struct ProfilePreset {
    pub encode: BuiltinEncoder,
    pub mode: TokenizeMode,
    pub threshold: u8,
    pub depth: usize,
}

impl Profile {
    pub const ALL: [Profile; 6] = [
        Profile::Memory,
        Profile::Speed,
        Profile::Match,
        Profile::Score,
        Profile::Balance,
        Profile::Fastest,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Memory => "memory",
            Profile::Speed => "speed",
            Profile::Match => "match",
            Profile::Score => "score",
            Profile::Balance => "balance",
            Profile::Fastest => "fastest",
        }
    }

    pub fn preset(&self) -> ProfilePreset {
        let (encode, mode, threshold, depth) = match self {
            Profile::Memory => (BuiltinEncoder::Extra, TokenizeMode::Strict, 7, 0),
            Profile::Speed => (BuiltinEncoder::Icase, TokenizeMode::Strict, 7, 2),
            Profile::Match => (BuiltinEncoder::Extra, TokenizeMode::Full, 0, 0),
            Profile::Score => (BuiltinEncoder::Extra, TokenizeMode::Strict, 5, 4),
            Profile::Balance => (BuiltinEncoder::Balance, TokenizeMode::Ngram, 6, 3),
            Profile::Fastest => (BuiltinEncoder::Icase, TokenizeMode::Strict, 9, 1),
        };
        ProfilePreset {
            encode,
            mode,
            threshold,
            depth,
        }
    }
}

/// Query cache setting.
///
/// Serialized as `false`, `true` or a capacity, so configs can say
/// `"cache": 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "CacheRepr", into = "CacheRepr")]
pub enum CacheSetting {
    #[default]
    Disabled,
    Unbounded,
    Capacity(usize),
}

impl CacheSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheSetting::Disabled | CacheSetting::Capacity(0))
    }

    /// Capacity for a [`FrequencyCache`](crate::cache::FrequencyCache), or
    /// `None` when the cache is disabled.
    pub fn capacity(&self) -> Option<Option<usize>> {
        match *self {
            CacheSetting::Disabled | CacheSetting::Capacity(0) => None,
            CacheSetting::Unbounded => Some(None),
            CacheSetting::Capacity(n) => Some(Some(n)),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CacheRepr {
    Flag(bool),
    Capacity(usize),
}

impl From<CacheRepr> for CacheSetting {
    fn from(repr: CacheRepr) -> Self {
        match repr {
            CacheRepr::Flag(false) | CacheRepr::Capacity(0) => CacheSetting::Disabled,
            CacheRepr::Flag(true) => CacheSetting::Unbounded,
            CacheRepr::Capacity(n) => CacheSetting::Capacity(n),
        }
    }
}

impl From<CacheSetting> for CacheRepr {
    fn from(setting: CacheSetting) -> Self {
        match setting {
            CacheSetting::Disabled => CacheRepr::Flag(false),
            CacheSetting::Unbounded => CacheRepr::Flag(true),
            CacheSetting::Capacity(n) => CacheRepr::Capacity(n),
        }
    }
}

/// Rules given inline or by the name they were registered under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSource<T> {
    Named(String),
    Inline(T),
}

/// Configuration of an index.
///
/// Every option falls back to the profile's value, then to the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub profile: Option<Profile>,
    /// Encoder applied after the matchers. Defaults to `icase`.
    pub encode: Option<EncoderKind>,
    /// Tokenization mode. Defaults to `ngram`.
    pub mode: Option<TokenizeMode>,
    /// Fill results with partial matches when a query under-fills its limit.
    pub suggest: bool,
    pub cache: CacheSetting,
    /// Minimum score a posting needs, 0 to 9.
    pub threshold: Option<u8>,
    /// Radius of the context window; 0 disables contextual search.
    pub depth: Option<usize>,
    /// Regex replacements applied before encoding, or a registered matcher set.
    pub matcher: Option<RuleSource<Vec<(String, String)>>>,
    /// Stopwords, or the name of a registered language pack.
    pub filter: Option<RuleSource<Vec<String>>>,
    /// Suffix rewrites, or the name of a registered language pack.
    pub stemmer: Option<RuleSource<Vec<(String, String)>>>,
    /// Number of shards for a sharded index.
    pub worker: Option<usize>,
    /// Queue mutations and apply them on a background runner.
    pub deferred: bool,
}

/// Fully resolved index settings.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub mode: TokenizeMode,
    pub threshold: u8,
    pub depth: usize,
    pub suggest: bool,
    pub cache: CacheSetting,
    pub pipeline: EncodePipeline,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Config for a named profile. Unknown names yield the defaults.
    pub fn from_profile_name(name: &str) -> Self {
        let profile = Profile::from_name(name);
        if profile.is_none() {
            warn!("unknown profile {name:?}, using defaults");
        }
        IndexConfig {
            profile,
            ..Self::default()
        }
    }

    /// Parse a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve every option against the profile, the defaults and `registry`.
    pub fn resolve(&self, registry: &Registry) -> Result<IndexSettings> {
        let preset = self.profile.map(|p| p.preset());

        let mode = self
            .mode
            .clone()
            .or_else(|| preset.as_ref().map(|p| p.mode.clone()))
            .unwrap_or_default();

        let mut threshold = self
            .threshold
            .or(preset.as_ref().map(|p| p.threshold))
            .unwrap_or(0);
        if threshold > MAX_BUCKET {
            warn!("threshold {threshold} is above {MAX_BUCKET}, clamping");
            threshold = MAX_BUCKET;
        }

        let mut depth = self.depth.or(preset.as_ref().map(|p| p.depth)).unwrap_or(0);
        if depth > 0 && !mode.is_whole_word() {
            warn!(
                "depth {depth} has no effect with mode {:?}, contextual search disabled",
                mode.name()
            );
            depth = 0;
        }

        let encoder = match &self.encode {
            Some(kind) => resolve_encoder(kind, registry),
            None => {
                let name = preset
                    .as_ref()
                    .map(|p| p.encode)
                    .unwrap_or(BuiltinEncoder::Icase);
                resolve_encoder(&EncoderKind::from(name), registry)
            }
        };

        let mut builder = EncodePipeline::builder();
        if let Some(source) = &self.matcher {
            let rules = match source {
                RuleSource::Named(name) => registry
                    .matcher(name)
                    .ok_or_else(|| LotusError::not_found(format!("matcher '{name}'")))?,
                RuleSource::Inline(rules) => rules.as_slice(),
            };
            builder = builder.matcher(MatcherRules::compile(rules)?);
        }
        if let Some(source) = &self.filter {
            let words = match source {
                RuleSource::Named(name) => &registry
                    .language(name)
                    .ok_or_else(|| LotusError::not_found(format!("language '{name}'")))?
                    .filter,
                RuleSource::Inline(words) => words,
            };
            builder = builder.filter(StopwordFilter::new(words, encoder.as_deref())?);
        }
        if let Some(source) = &self.stemmer {
            let rules = match source {
                RuleSource::Named(name) => &registry
                    .language(name)
                    .ok_or_else(|| LotusError::not_found(format!("language '{name}'")))?
                    .stemmer,
                RuleSource::Inline(rules) => rules,
            };
            builder = builder.stemmer(Stemmer::new(rules, encoder.as_deref())?);
        }
        if let Some(encoder) = encoder {
            builder = builder.encoder(encoder);
        }

        Ok(IndexSettings {
            mode,
            threshold,
            depth,
            suggest: self.suggest,
            cache: self.cache,
            pipeline: builder.build(),
        })
    }
}

fn resolve_encoder(kind: &EncoderKind, registry: &Registry) -> Option<Arc<dyn Encoder>> {
    match kind {
        EncoderKind::Custom(encoder) => Some(encoder.clone()),
        EncoderKind::Named(name) => {
            let encoder = registry.encoder(name);
            if encoder.is_none() {
                warn!("unknown encoder {name:?}, text will not be encoded");
            }
            encoder
        }
    }
}

#[derive(Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn profile(mut self, profile: Profile) -> Self {
        self.config.profile = Some(profile);
        self
    }

    pub fn encode(mut self, encode: impl Into<EncoderKind>) -> Self {
        self.config.encode = Some(encode.into());
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.config.encode = Some(EncoderKind::Custom(encoder));
        self
    }

    pub fn mode(mut self, mode: TokenizeMode) -> Self {
        self.config.mode = Some(mode);
        self
    }

    pub fn suggest(mut self, suggest: bool) -> Self {
        self.config.suggest = suggest;
        self
    }

    pub fn cache(mut self, cache: CacheSetting) -> Self {
        self.config.cache = cache;
        self
    }

    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = Some(threshold);
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.config.depth = Some(depth);
        self
    }

    pub fn matcher<I, P, R>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(p, r)| (p.into(), r.into()))
            .collect();
        self.config.matcher = Some(RuleSource::Inline(rules));
        self
    }

    pub fn matcher_named(mut self, name: impl Into<String>) -> Self {
        self.config.matcher = Some(RuleSource::Named(name.into()));
        self
    }

    pub fn filter<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = words.into_iter().map(Into::into).collect();
        self.config.filter = Some(RuleSource::Inline(words));
        self
    }

    pub fn stemmer<I, S, R>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = (S, R)>,
        S: Into<String>,
        R: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(s, r)| (s.into(), r.into()))
            .collect();
        self.config.stemmer = Some(RuleSource::Inline(rules));
        self
    }

    /// Take the stopword filter and the stemmer from a registered language
    /// pack.
    pub fn language(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.config.filter = Some(RuleSource::Named(name.clone()));
        self.config.stemmer = Some(RuleSource::Named(name));
        self
    }

    pub fn worker(mut self, shards: usize) -> Self {
        self.config.worker = Some(shards);
        self
    }

    pub fn deferred(mut self, deferred: bool) -> Self {
        self.config.deferred = deferred;
        self
    }

    pub fn build(self) -> IndexConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::registry::LanguagePack;

    #[test]
    fn test_defaults() {
        let settings = IndexConfig::default().resolve(&Registry::new()).unwrap();
        assert!(matches!(settings.mode, TokenizeMode::Ngram));
        assert_eq!(settings.threshold, 0);
        assert_eq!(settings.depth, 0);
        assert!(!settings.suggest);
        assert_eq!(settings.cache, CacheSetting::Disabled);
        assert_eq!(settings.pipeline.encoder().unwrap().name(), "icase");
    }

    #[test]
    fn test_profile_and_override() {
        let config = IndexConfig::builder()
            .profile(Profile::Speed)
            .threshold(3)
            .build();
        let settings = config.resolve(&Registry::new()).unwrap();
        assert!(matches!(settings.mode, TokenizeMode::Strict));
        assert_eq!(settings.threshold, 3);
        assert_eq!(settings.depth, 2);

        let settings = IndexConfig::from_profile_name("balance")
            .resolve(&Registry::new())
            .unwrap();
        assert_eq!(settings.pipeline.encoder().unwrap().name(), "balance");
        assert_eq!(settings.depth, 3);
    }

    #[test]
    fn test_unknown_profile_falls_back() {
        let config = IndexConfig::from_profile_name("turbo");
        assert!(config.profile.is_none());
        assert!(Profile::from_name("fastest").is_some());
    }

    #[test]
    fn test_threshold_clamped_and_depth_dropped() {
        let config = IndexConfig::builder()
            .threshold(12)
            .mode(TokenizeMode::Forward)
            .depth(2)
            .build();
        let settings = config.resolve(&Registry::new()).unwrap();
        assert_eq!(settings.threshold, 9);
        assert_eq!(settings.depth, 0);
    }

    #[test]
    fn test_unknown_encoder_is_tolerated() {
        let config = IndexConfig::builder().encode("klingon").build();
        let settings = config.resolve(&Registry::new()).unwrap();
        assert!(settings.pipeline.encoder().is_none());
    }

    #[test]
    fn test_named_rules_must_exist() {
        let config = IndexConfig::builder().matcher_named("missing").build();
        let err = config.resolve(&Registry::new()).unwrap_err();
        assert!(matches!(err, LotusError::NotFound(_)));

        let config = IndexConfig::builder().language("en").build();
        assert!(config.resolve(&Registry::new()).is_err());

        let mut registry = Registry::new();
        registry
            .register_language(
                "en",
                LanguagePack {
                    filter: vec!["the".to_string()],
                    stemmer: vec![("ing".to_string(), "".to_string())],
                },
            )
            .unwrap();
        let settings = config.resolve(&registry).unwrap();
        assert_eq!(settings.pipeline.encode("the walking").unwrap(), "walk");
    }

    #[test]
    fn test_config_from_json() {
        let config = IndexConfig::from_json(
            r#"{
                "profile": "score",
                "encode": "simple",
                "cache": 50,
                "suggest": true,
                "matcher": [["ä", "a"]],
                "filter": ["and"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.profile, Some(Profile::Score));
        assert_eq!(config.cache, CacheSetting::Capacity(50));
        assert!(config.suggest);
        assert!(matches!(config.filter, Some(RuleSource::Inline(_))));

        let config = IndexConfig::from_json(r#"{"cache": true, "mode": "forward"}"#).unwrap();
        assert_eq!(config.cache, CacheSetting::Unbounded);
        assert!(matches!(config.mode, Some(TokenizeMode::Forward)));

        let json = serde_json::to_string(&config).unwrap();
        let back = IndexConfig::from_json(&json).unwrap();
        assert_eq!(back.cache, CacheSetting::Unbounded);
    }

    #[test]
    fn test_cache_setting_capacity() {
        assert_eq!(CacheSetting::Disabled.capacity(), None);
        assert_eq!(CacheSetting::Capacity(0).capacity(), None);
        assert_eq!(CacheSetting::Unbounded.capacity(), Some(None));
        assert_eq!(CacheSetting::Capacity(8).capacity(), Some(Some(8)));
        assert!(!CacheSetting::Capacity(0).is_enabled());
    }
}
