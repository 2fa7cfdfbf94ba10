//! # Lotus
//!
//! An in-memory full-text index for short documents, scoring postings into
//! relevance buckets instead of ranking them at query time.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Pluggable encoders, matchers, stopword filters and stemmers
//! - Strict, forward, reverse and full fragment tokenization
//! - Contextual word-sequence matching
//! - Suggestion fallback for partial matches
//! - Frequency-ranked query cache
//! - Deferred and sharded execution

pub mod analysis;
pub mod cache;
mod data;
pub mod engine;
mod error;
pub mod lexical;
pub mod maintenance;
pub mod store;
pub mod worker;

// Re-exports for the public API
pub use analysis::{EncoderKind, Registry, TokenizeMode};
pub use data::DocId;
pub use engine::config::{CacheSetting, IndexConfig, Profile};
pub use engine::search::SearchRequest;
pub use engine::{DeferredEngine, DocumentIndex, Engine, IndexInfo, open};
pub use error::{LotusError, Result};
pub use worker::ShardedEngine;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
