//! Messages exchanged between a [`ShardedEngine`](super::ShardedEngine) and
//! its shards.
//!
//! Shards are configured with data only: a shard builds its own [`Engine`]
//! from the [`IndexConfig`] it receives at registration.
//!
//! [`Engine`]: crate::engine::Engine

use serde::{Deserialize, Serialize};

use crate::data::DocId;
use crate::engine::IndexInfo;
use crate::engine::config::IndexConfig;

/// A request to a shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Build the shard's index. Sent once, before anything else.
    Register { shard_id: usize, config: IndexConfig },
    Add { id: DocId, content: String },
    Update { id: DocId, content: String },
    Remove { id: DocId },
    Search {
        ticket: u64,
        query: String,
        limit: usize,
        threshold: Option<u8>,
    },
    Reset,
    Info,
    /// Stop the shard thread.
    Shutdown,
}

/// A shard's answer to a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReply {
    pub shard_id: usize,
    /// Ticket of the search this reply belongs to.
    pub ticket: u64,
    pub query: String,
    pub limit: usize,
    pub result: Vec<DocId>,
    /// Set when the shard failed to resolve the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A message from a shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerResponse {
    Search(SearchReply),
    Info { shard_id: usize, info: IndexInfo },
}
