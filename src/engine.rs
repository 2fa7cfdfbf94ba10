//! The in-process index and the interface shared by every scheduling mode.
//!
//! [`Engine`] owns the score index, the context index, the document registry
//! and the query cache. It is single threaded: mutations and queries take
//! `&mut self` and callers that share an engine serialize access themselves.
//! [`DeferredEngine`] and [`ShardedEngine`](crate::worker::ShardedEngine)
//! layer background scheduling on top and implement the same
//! [`DocumentIndex`] interface.

pub mod config;
pub mod deferred;
pub mod search;

use std::mem::size_of;
use std::sync::Arc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::analysis::encoder::Encoder;
use crate::analysis::registry::Registry;
use crate::cache::FrequencyCache;
use crate::data::DocId;
use crate::error::Result;
use crate::lexical::bucket::{ContextIndex, ScoreIndex};
use crate::lexical::searcher::QueryResolver;
use crate::lexical::writer::DocumentWriter;
use crate::store::document::{DocumentRegistry, Placement};
use crate::worker::pool::ShardedEngine;

use self::config::{IndexConfig, IndexSettings};
pub use self::deferred::DeferredEngine;
use self::search::SearchRequest;

/// Callback receiving the result of a scheduled search.
pub type SearchCallback = Box<dyn FnOnce(Result<Vec<DocId>>) + Send + 'static>;

/// Operations common to every index flavour.
pub trait DocumentIndex: Send {
    /// Index `content` under `id`, replacing any previous content.
    fn add(&mut self, id: DocId, content: &str) -> Result<()>;

    /// Replace the content of a known id. Returns false for unknown ids.
    fn update(&mut self, id: DocId, content: &str) -> Result<bool>;

    /// Remove a document. Returns false for unknown ids.
    fn remove(&mut self, id: &DocId) -> Result<bool>;

    fn search(&mut self, request: SearchRequest) -> Result<Vec<DocId>>;

    /// Drop every document and cached query, keeping the configuration.
    fn reset(&mut self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn info(&self) -> Result<IndexInfo>;
}

/// Size and state statistics of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Number of indexed documents.
    pub items: usize,
    /// Postings in the score index.
    pub sequences: usize,
    /// Postings in the context index.
    pub context_sequences: usize,
    /// Total characters of the posted tokens.
    pub chars: usize,
    /// Approximate heap footprint of the postings and ids, in bytes.
    pub memory: usize,
    /// Whether the index is unchanged since the last query.
    pub clean: bool,
    pub cached_queries: usize,
    /// Mutations waiting in a deferred queue.
    pub pending_tasks: usize,
    pub matchers: usize,
    pub workers: usize,
    pub threshold: u8,
    pub depth: usize,
    pub mode: String,
    pub encoder: Option<String>,
}

impl IndexInfo {
    /// Fold the statistics of another shard into this one.
    pub fn merge(&mut self, other: &IndexInfo) {
        self.items += other.items;
        self.sequences += other.sequences;
        self.context_sequences += other.context_sequences;
        self.chars += other.chars;
        self.memory += other.memory;
        self.clean &= other.clean;
        self.pending_tasks += other.pending_tasks;
    }
}

/// An in-memory full-text index.
#[derive(Debug)]
pub struct Engine {
    config: IndexConfig,
    settings: IndexSettings,
    primary: ScoreIndex,
    context: ContextIndex,
    documents: DocumentRegistry,
    cache: Option<FrequencyCache<Vec<DocId>>>,
}

impl Engine {
    /// Create an index, resolving named components in `registry`.
    pub fn new(config: IndexConfig, registry: Arc<Registry>) -> Result<Self> {
        let settings = config.resolve(&registry)?;
        debug!(
            "created index: mode={} threshold={} depth={} suggest={} cache={:?}",
            settings.mode.name(),
            settings.threshold,
            settings.depth,
            settings.suggest,
            settings.cache
        );

        let cache = settings.cache.capacity().map(FrequencyCache::new);

        Ok(Engine {
            config,
            settings,
            primary: ScoreIndex::new(),
            context: ContextIndex::new(),
            documents: DocumentRegistry::new(),
            cache,
        })
    }

    /// An index with the default configuration and built-in encoders.
    pub fn with_defaults() -> Result<Self> {
        Self::new(IndexConfig::default(), Arc::new(Registry::new()))
    }

    /// An index configured from a named profile; unknown names use the
    /// defaults.
    pub fn from_profile(name: &str) -> Result<Self> {
        Self::new(IndexConfig::from_profile_name(name), Arc::new(Registry::new()))
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Run text through the index's encode pipeline.
    pub fn encode(&self, text: &str) -> Result<String> {
        self.settings.pipeline.encode(text)
    }

    /// Index `content` under `id`.
    ///
    /// A known id is removed first. Blank ids and empty content are ignored;
    /// content that encodes to nothing leaves the id unindexed.
    pub fn add(&mut self, id: impl Into<DocId>, content: &str) -> Result<()> {
        let id = id.into();
        if id.is_blank() || content.is_empty() {
            trace!("ignoring add of blank id or empty content");
            return Ok(());
        }

        if self.documents.contains(&id) {
            self.remove_postings(&id);
        }

        let encoded = self.encode(content)?;
        if encoded.is_empty() {
            return Ok(());
        }
        let words = self.settings.mode.split_words(&encoded)?;

        let stats = DocumentWriter::new(
            &mut self.primary,
            &mut self.context,
            self.settings.threshold,
            self.settings.depth,
        )
        .write(&id, &words, &self.settings.mode);
        trace!(
            "indexed {id}: {} postings, {} context postings",
            stats.postings, stats.context_postings
        );

        self.documents.insert(id, Placement::Local);
        Ok(())
    }

    /// Replace the content of a known id. Same as `remove` followed by `add`.
    pub fn update(&mut self, id: impl Into<DocId>, content: &str) -> Result<bool> {
        let id = id.into();
        if !self.documents.contains(&id) {
            return Ok(false);
        }
        self.remove_postings(&id);
        self.add(id, content)?;
        Ok(true)
    }

    /// Remove a document and every posting it left behind.
    pub fn remove(&mut self, id: impl Into<DocId>) -> Result<bool> {
        let id = id.into();
        if !self.documents.contains(&id) {
            return Ok(false);
        }
        self.remove_postings(&id);
        Ok(true)
    }

    fn remove_postings(&mut self, id: &DocId) {
        let removed = self.primary.remove_document(id);
        let context_removed = if self.settings.depth > 0 {
            self.context.remove_document(id)
        } else {
            0
        };
        self.documents.remove(id);
        trace!("removed {id}: {removed} postings, {context_removed} context postings");
    }

    /// Resolve a query.
    ///
    /// Results are cached by raw query text. Any mutation since the previous
    /// query empties the cache before it is consulted.
    pub fn search(&mut self, request: impl Into<SearchRequest>) -> Result<Vec<DocId>> {
        let request = request.into();
        if request.query.is_empty() {
            return Ok(Vec::new());
        }

        let dirty = self.documents.take_dirty();
        if let Some(cache) = self.cache.as_mut() {
            if dirty {
                cache.reset();
            } else if let Some(hit) = cache.get(&request.query) {
                return Ok(hit.clone());
            }
        }

        let encoded = self.encode(&request.query)?;
        if encoded.is_empty() {
            return Ok(Vec::new());
        }
        let words = self.settings.mode.split_words(&encoded)?;

        let result = QueryResolver::new(
            &self.primary,
            &self.context,
            self.settings.depth,
            self.settings.suggest,
        )
        .resolve(
            words,
            request.effective_threshold(self.settings.threshold),
            request.effective_limit(),
        );

        if let Some(cache) = self.cache.as_mut() {
            cache.set(request.query, result.clone());
        }
        Ok(result)
    }

    pub fn contains(&self, id: &DocId) -> bool {
        self.documents.contains(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop every document and cached query, keeping the configuration.
    pub fn reset(&mut self) {
        self.primary.clear();
        self.context.clear();
        self.documents = DocumentRegistry::new();
        if let Some(cache) = self.cache.as_mut() {
            cache.reset();
        }
    }

    pub fn info(&self) -> IndexInfo {
        let mut memory = 0;
        let mut chars = 0;
        for (_, token, postings) in self.primary.entries() {
            memory += postings.len() * size_of::<DocId>() + token.len() + size_of::<String>();
            chars += token.chars().count();
        }
        for id in self.documents.ids() {
            memory += size_of::<DocId>() + id.as_text().map_or(0, str::len);
        }

        IndexInfo {
            items: self.documents.len(),
            sequences: self.primary.posting_count(),
            context_sequences: self.context.posting_count(),
            chars,
            memory,
            clean: self.documents.is_clean(),
            cached_queries: self.cache.as_ref().map_or(0, FrequencyCache::len),
            pending_tasks: 0,
            matchers: self.settings.pipeline.matcher_count(),
            workers: 0,
            threshold: self.settings.threshold,
            depth: self.settings.depth,
            mode: self.settings.mode.name().to_string(),
            encoder: self
                .settings
                .pipeline
                .encoder()
                .map(|encoder| encoder.name().to_string()),
        }
    }
}

impl DocumentIndex for Engine {
    fn add(&mut self, id: DocId, content: &str) -> Result<()> {
        Engine::add(self, id, content)
    }

    fn update(&mut self, id: DocId, content: &str) -> Result<bool> {
        Engine::update(self, id, content)
    }

    fn remove(&mut self, id: &DocId) -> Result<bool> {
        Engine::remove(self, id)
    }

    fn search(&mut self, request: SearchRequest) -> Result<Vec<DocId>> {
        Engine::search(self, request)
    }

    fn reset(&mut self) -> Result<()> {
        Engine::reset(self);
        Ok(())
    }

    fn len(&self) -> usize {
        Engine::len(self)
    }

    fn info(&self) -> Result<IndexInfo> {
        Ok(Engine::info(self))
    }
}

/// Build the index flavour a config asks for.
///
/// A `worker` count selects a [`ShardedEngine`], `deferred` selects a
/// [`DeferredEngine`], otherwise a plain [`Engine`] is returned.
pub fn open(config: IndexConfig, registry: Arc<Registry>) -> Result<Box<dyn DocumentIndex>> {
    if let Some(shards) = config.worker {
        return Ok(Box::new(ShardedEngine::new(config, registry, shards)?));
    }
    if config.deferred {
        return Ok(Box::new(DeferredEngine::new(config, registry)?));
    }
    Ok(Box::new(Engine::new(config, registry)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::TokenizeMode;
    use crate::engine::config::CacheSetting;

    fn strict(depth: usize) -> Engine {
        let config = IndexConfig::builder()
            .mode(TokenizeMode::Strict)
            .depth(depth)
            .build();
        Engine::new(config, Arc::new(Registry::new())).unwrap()
    }

    #[test]
    fn test_add_and_search() {
        let mut engine = strict(0);
        engine.add(1, "John Doe").unwrap();
        engine.add(2, "Jane Doe").unwrap();

        let mut result = engine.search("doe").unwrap();
        result.sort();
        assert_eq!(result, vec![DocId::Int(1), DocId::Int(2)]);
        assert_eq!(engine.search("john doe").unwrap(), vec![DocId::Int(1)]);
        assert!(engine.search("").unwrap().is_empty());
    }

    #[test]
    fn test_add_existing_id_reindexes() {
        let mut engine = strict(0);
        engine.add(1, "apple").unwrap();
        engine.add(1, "banana").unwrap();

        assert!(engine.search("apple").unwrap().is_empty());
        assert_eq!(engine.search("banana").unwrap(), vec![DocId::Int(1)]);
        assert_eq!(engine.info().sequences, 1);
    }

    #[test]
    fn test_tolerant_inputs() {
        let mut engine = strict(0);
        engine.add("", "ignored").unwrap();
        engine.add(1, "").unwrap();
        assert!(engine.is_empty());

        assert!(!engine.remove(9).unwrap());
        assert!(!engine.update(9, "x").unwrap());
    }

    #[test]
    fn test_remove_clears_context() {
        let mut engine = strict(2);
        engine.add(1, "red green blue").unwrap();
        assert!(engine.info().context_sequences > 0);

        assert!(engine.remove(1).unwrap());
        let info = engine.info();
        assert_eq!(info.sequences, 0);
        assert_eq!(info.context_sequences, 0);
        assert!(!engine.remove(1).unwrap());
    }

    #[test]
    fn test_cache_is_reset_by_mutation() {
        let config = IndexConfig::builder()
            .mode(TokenizeMode::Strict)
            .cache(CacheSetting::Capacity(10))
            .build();
        let mut engine = Engine::new(config, Arc::new(Registry::new())).unwrap();

        engine.add(1, "cached words").unwrap();
        assert_eq!(engine.search("cached").unwrap(), vec![DocId::Int(1)]);
        assert_eq!(engine.info().cached_queries, 1);

        engine.remove(1).unwrap();
        assert!(engine.search("cached").unwrap().is_empty());
        assert_eq!(engine.info().cached_queries, 1);
        assert!(engine.info().clean);
    }

    #[test]
    fn test_reset_keeps_config() {
        let mut engine = strict(1);
        engine.add(1, "one two").unwrap();
        engine.reset();

        assert!(engine.is_empty());
        assert_eq!(engine.info().sequences, 0);
        engine.add(2, "one two").unwrap();
        assert_eq!(engine.search("one two").unwrap(), vec![DocId::Int(2)]);
        assert_eq!(engine.settings().depth, 1);
    }

    #[test]
    fn test_info() {
        let mut engine = strict(0);
        engine.add("doc", "hello world").unwrap();

        let info = engine.info();
        assert_eq!(info.items, 1);
        assert_eq!(info.sequences, 2);
        assert_eq!(info.chars, 10);
        assert!(info.memory > 0);
        assert!(!info.clean);
        assert_eq!(info.mode, "strict");
        assert_eq!(info.encoder.as_deref(), Some("icase"));
    }

    #[test]
    fn test_open_selects_flavour() {
        let registry = Arc::new(Registry::new());
        let mut index = open(IndexConfig::default(), registry.clone()).unwrap();
        index.add(DocId::from(1), "flavour").unwrap();
        assert_eq!(index.len(), 1);

        let config = IndexConfig::builder().worker(0).build();
        assert!(open(config, registry).is_err());
    }
}
