//! Registry of named encoders, matcher rule sets and language packs.
//!
//! A `Registry` is built once, populated during setup, then shared as an
//! `Arc<Registry>` by every index constructed from it. Names are registered
//! once and looked up thereafter.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::encoder::{BuiltinEncoder, Encoder};
use crate::analysis::rules::MatcherRules;
use crate::error::{LotusError, Result};

/// A stopword list and stemmer rules for one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguagePack {
    #[serde(default)]
    pub filter: Vec<String>,
    #[serde(default)]
    pub stemmer: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct Registry {
    encoders: AHashMap<String, Arc<dyn Encoder>>,
    matchers: AHashMap<String, Vec<(String, String)>>,
    languages: AHashMap<String, LanguagePack>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry with the built-in encoders registered.
    pub fn new() -> Self {
        let mut encoders: AHashMap<String, Arc<dyn Encoder>> = AHashMap::new();
        for encoder in BuiltinEncoder::ALL {
            encoders.insert(encoder.name().to_string(), Arc::new(encoder));
        }
        Registry {
            encoders,
            matchers: AHashMap::new(),
            languages: AHashMap::new(),
        }
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Registry {
            encoders: AHashMap::new(),
            matchers: AHashMap::new(),
            languages: AHashMap::new(),
        }
    }

    pub fn register_encoder<S: Into<String>>(
        &mut self,
        name: S,
        encoder: Arc<dyn Encoder>,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.encoders.contains_key(&name) {
            return Err(LotusError::invalid_argument(format!(
                "encoder '{name}' is already registered"
            )));
        }
        self.encoders.insert(name, encoder);
        Ok(self)
    }

    /// Register a named matcher rule set. Patterns are validated eagerly.
    pub fn register_matcher<S: Into<String>>(
        &mut self,
        name: S,
        rules: Vec<(String, String)>,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.matchers.contains_key(&name) {
            return Err(LotusError::invalid_argument(format!(
                "matcher '{name}' is already registered"
            )));
        }
        MatcherRules::compile(&rules)?;
        self.matchers.insert(name, rules);
        Ok(self)
    }

    pub fn register_language<S: Into<String>>(
        &mut self,
        name: S,
        pack: LanguagePack,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.languages.contains_key(&name) {
            return Err(LotusError::invalid_argument(format!(
                "language '{name}' is already registered"
            )));
        }
        self.languages.insert(name, pack);
        Ok(self)
    }

    pub fn encoder(&self, name: &str) -> Option<Arc<dyn Encoder>> {
        self.encoders.get(name).cloned()
    }

    pub fn matcher(&self, name: &str) -> Option<&[(String, String)]> {
        self.matchers.get(name).map(Vec::as_slice)
    }

    pub fn language(&self, name: &str) -> Option<&LanguagePack> {
        self.languages.get(name)
    }

    /// Encode text with a registered encoder.
    pub fn encode(&self, name: &str, text: &str) -> Result<String> {
        let encoder = self
            .encoders
            .get(name)
            .ok_or_else(|| LotusError::not_found(format!("encoder '{name}'")))?;
        encoder.encode(text)
    }
}
