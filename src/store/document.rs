//! Registry of indexed document ids.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::data::DocId;

/// Where a document's postings live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// In the index holding the registry.
    Local,
    /// In the shard with this number.
    Shard(usize),
}

/// Tracks known documents and whether the index changed since the last query.
///
/// The registry is the single source of truth for whether an id exists. Every
/// mutation marks it dirty; [`take_dirty`](Self::take_dirty) reports and clears
/// that state so the caller can drop cached results exactly once per change.
#[derive(Debug, Clone)]
pub struct DocumentRegistry {
    entries: AHashMap<DocId, Placement>,
    clean: bool,
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRegistry {
    pub fn new() -> Self {
        DocumentRegistry {
            entries: AHashMap::new(),
            clean: true,
        }
    }

    pub fn insert(&mut self, id: DocId, placement: Placement) {
        self.entries.insert(id, placement);
        self.clean = false;
    }

    /// Forget `id`. Unknown ids leave the registry untouched.
    pub fn remove(&mut self, id: &DocId) -> Option<Placement> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            self.clean = false;
        }
        removed
    }

    pub fn get(&self, id: &DocId) -> Option<Placement> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &DocId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Returns true if the registry changed since the previous call, and
    /// marks it clean.
    pub fn take_dirty(&mut self) -> bool {
        let dirty = !self.clean;
        self.clean = true;
        dirty
    }

    pub fn ids(&self) -> impl Iterator<Item = &DocId> {
        self.entries.keys()
    }

    /// Number of documents placed on `shard`.
    pub fn count_on(&self, shard: usize) -> usize {
        self.entries
            .values()
            .filter(|placement| **placement == Placement::Shard(shard))
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.clean = false;
    }
}
