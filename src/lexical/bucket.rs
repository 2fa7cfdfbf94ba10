//! Bucketed posting storage.
//!
//! [`ScoreIndex`] holds ten buckets of token → posting list maps.
//! [`ContextIndex`] maps an anchor token to its own `ScoreIndex` of the
//! tokens seen near it. Removal is typed per structure: the context index
//! removes through each anchor's `ScoreIndex`.

use std::borrow::Cow;

use ahash::AHashMap;

use crate::data::DocId;
use crate::lexical::scoring::{BUCKET_COUNT, MAX_BUCKET};

/// Document ids recorded against one token in one bucket, in insertion order.
pub type PostingList = Vec<DocId>;

#[derive(Debug, Clone)]
pub struct ScoreIndex {
    buckets: [AHashMap<String, PostingList>; BUCKET_COUNT],
}

impl Default for ScoreIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreIndex {
    pub fn new() -> Self {
        ScoreIndex {
            buckets: std::array::from_fn(|_| AHashMap::new()),
        }
    }

    /// Append a posting for `token` to bucket `bucket`.
    pub fn insert(&mut self, bucket: usize, token: &str, id: &DocId) {
        let bucket = bucket.min(BUCKET_COUNT - 1);
        match self.buckets[bucket].get_mut(token) {
            Some(postings) => postings.push(id.clone()),
            None => {
                self.buckets[bucket].insert(token.to_string(), vec![id.clone()]);
            }
        }
    }

    pub fn get(&self, bucket: usize, token: &str) -> Option<&PostingList> {
        self.buckets.get(bucket).and_then(|b| b.get(token))
    }

    pub fn bucket(&self, bucket: usize) -> &AHashMap<String, PostingList> {
        &self.buckets[bucket]
    }

    /// Posting lists of `token` from bucket 9 down to `threshold`.
    pub fn scan(&self, token: &str, threshold: u8) -> Vec<&[DocId]> {
        (threshold.min(MAX_BUCKET)..=MAX_BUCKET)
            .rev()
            .filter_map(|z| self.buckets[z as usize].get(token))
            .filter(|postings| !postings.is_empty())
            .map(Vec::as_slice)
            .collect()
    }

    /// Combined postings of `token` from bucket 9 down to `threshold`.
    ///
    /// Borrows the posting list when a single bucket matches.
    pub fn lookup(&self, token: &str, threshold: u8) -> Option<Cow<'_, [DocId]>> {
        let mut lists = self.scan(token, threshold);
        match lists.len() {
            0 => None,
            1 => lists.pop().map(Cow::Borrowed),
            _ => Some(Cow::Owned(lists.concat())),
        }
    }

    /// Remove every posting of `id`, dropping tokens left without postings.
    ///
    /// Returns the number of postings removed.
    pub fn remove_document(&mut self, id: &DocId) -> usize {
        let mut removed = 0;
        for bucket in self.buckets.iter_mut() {
            bucket.retain(|_, postings| {
                let before = postings.len();
                postings.retain(|posted| posted != id);
                removed += before - postings.len();
                !postings.is_empty()
            });
        }
        removed
    }

    /// Number of distinct (bucket, token) entries.
    pub fn token_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    /// Total number of postings.
    pub fn posting_count(&self) -> usize {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.values())
            .map(Vec::len)
            .sum()
    }

    /// Iterate over `(bucket, token, postings)`.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str, &PostingList)> {
        self.buckets.iter().enumerate().flat_map(|(z, bucket)| {
            bucket
                .iter()
                .map(move |(token, postings)| (z, token.as_str(), postings))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.is_empty())
    }

    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
    }
}

/// Per-anchor co-occurrence index.
#[derive(Debug, Clone, Default)]
pub struct ContextIndex {
    anchors: AHashMap<String, ScoreIndex>,
}

impl ContextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self, token: &str) -> Option<&ScoreIndex> {
        self.anchors.get(token)
    }

    /// The anchor's index, created empty on first use.
    pub fn anchor_mut(&mut self, token: &str) -> &mut ScoreIndex {
        self.anchors.entry(token.to_string()).or_default()
    }

    /// Remove every posting of `id` under every anchor.
    ///
    /// Anchors whose index becomes empty are dropped.
    pub fn remove_document(&mut self, id: &DocId) -> usize {
        let mut removed = 0;
        self.anchors.retain(|_, index| {
            removed += index.remove_document(id);
            !index.is_empty()
        });
        removed
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn posting_count(&self) -> usize {
        self.anchors.values().map(ScoreIndex::posting_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
    }
}
