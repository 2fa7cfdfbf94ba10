//! Query resolution over the score and context indexes.

use std::borrow::Cow;

use ahash::AHashSet;

use crate::data::DocId;
use crate::lexical::bucket::{ContextIndex, ScoreIndex};
use crate::lexical::intersect::intersect;

/// Resolves tokenized queries against one index.
///
/// With a context depth and more than one word, the first word becomes the
/// context root and every following word is looked up among the neighbours
/// recorded for the word before it. Otherwise words are looked up in the
/// primary index, longest first.
pub struct QueryResolver<'a> {
    primary: &'a ScoreIndex,
    context: &'a ContextIndex,
    depth: usize,
    suggest: bool,
}

impl<'a> QueryResolver<'a> {
    pub fn new(
        primary: &'a ScoreIndex,
        context: &'a ContextIndex,
        depth: usize,
        suggest: bool,
    ) -> Self {
        QueryResolver {
            primary,
            context,
            depth,
            suggest,
        }
    }

    /// Resolve query words, scanning buckets from 9 down to `threshold`.
    ///
    /// Returns at most `limit` ids (0 means unlimited). A word without any
    /// match voids the query unless suggestions are enabled.
    pub fn resolve(&self, words: Vec<String>, threshold: u8, limit: usize) -> Vec<DocId> {
        let mut words: Vec<String> = words.into_iter().filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            return Vec::new();
        }

        let contextual = self.depth > 0 && words.len() > 1;
        if !contextual {
            words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        }

        match self.check_arrays(&words, contextual, threshold) {
            Some(arrays) => intersect(arrays, limit, self.suggest),
            None => Vec::new(),
        }
    }

    /// Collect one check array per distinct word, or `None` when the query
    /// cannot match.
    fn check_arrays(
        &self,
        words: &[String],
        contextual: bool,
        threshold: u8,
    ) -> Option<Vec<Cow<'a, [DocId]>>> {
        let mut checked: AHashSet<&str> = AHashSet::new();
        let mut arrays = Vec::with_capacity(words.len());

        let (mut root, rest) = if contextual {
            let root = words[0].as_str();
            // no co-occurrence data for the root: nothing can chain from it
            self.context.anchor(root)?;
            checked.insert(root);
            (root, &words[1..])
        } else {
            ("", words)
        };

        for word in rest {
            if checked.insert(word.as_str()) {
                let index = if contextual {
                    self.context.anchor(root)
                } else {
                    Some(self.primary)
                };

                match index.and_then(|index| index.lookup(word, threshold)) {
                    Some(postings) => arrays.push(postings),
                    None if self.suggest => {}
                    None => return None,
                }
            }
            root = word.as_str();
        }

        Some(arrays)
    }
}
