//! Indexing of a single document into the score and context indexes.

use ahash::AHashMap;

use crate::analysis::tokenizer::TokenizeMode;
use crate::data::DocId;
use crate::lexical::bucket::{ContextIndex, ScoreIndex};
use crate::lexical::scoring::{admits, bucket_of, context_score, score};

/// Statistics of one document write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Postings written to the score index.
    pub postings: usize,
    /// Postings written to the context index.
    pub context_postings: usize,
}

/// Writes the words of one document.
///
/// A writer lives for a single `add` call. It remembers the score of every
/// token it has seen so that a token repeated inside the document is posted
/// once, with the score of its first occurrence.
pub struct DocumentWriter<'a> {
    primary: &'a mut ScoreIndex,
    context: &'a mut ContextIndex,
    threshold: u8,
    depth: usize,
    seen: AHashMap<String, f64>,
    seen_context: AHashMap<String, AHashMap<String, f64>>,
    stats: WriteStats,
}

impl<'a> DocumentWriter<'a> {
    pub fn new(
        primary: &'a mut ScoreIndex,
        context: &'a mut ContextIndex,
        threshold: u8,
        depth: usize,
    ) -> Self {
        DocumentWriter {
            primary,
            context,
            threshold,
            depth,
            seen: AHashMap::new(),
            seen_context: AHashMap::new(),
            stats: WriteStats::default(),
        }
    }

    /// Post every word of the document. Empty words are skipped but keep
    /// their position.
    pub fn write(mut self, id: &DocId, words: &[String], mode: &TokenizeMode) -> WriteStats {
        let word_count = words.len();

        for (position, word) in words.iter().enumerate() {
            if word.is_empty() {
                continue;
            }
            let context = context_score(position, word_count);

            if !mode.is_whole_word() {
                for fragment in mode.fragments(word) {
                    self.stats.postings += post(
                        self.primary,
                        &mut self.seen,
                        &fragment.token,
                        id,
                        fragment.partial_score,
                        context,
                        self.threshold,
                    )
                    .1;
                }
                continue;
            }

            let (word_score, written) = post(
                self.primary,
                &mut self.seen,
                word,
                id,
                1.0,
                context,
                self.threshold,
            );
            self.stats.postings += written;

            if self.depth > 0 && word_count > 1 && admits(word_score, self.threshold) {
                self.write_context(id, words, position);
            }
        }

        self.stats
    }

    /// Post the neighbours within `depth` of the word at `position` under
    /// that word's anchor, scored by closeness.
    fn write_context(&mut self, id: &DocId, words: &[String], position: usize) {
        let anchor = &words[position];
        let start = position.saturating_sub(self.depth);
        let end = (position + self.depth + 1).min(words.len());

        let index = self.context.anchor_mut(anchor);
        let seen = self.seen_context.entry(anchor.clone()).or_default();

        for (x, neighbour) in words.iter().enumerate().take(end).skip(start) {
            if x == position || neighbour.is_empty() {
                continue;
            }
            let distance = x.abs_diff(position);
            let closeness = 10.0 - distance as f64;
            self.stats.context_postings +=
                post(index, seen, neighbour, id, 0.0, closeness, self.threshold).1;
        }
    }
}

/// Score `token` once per document and post it if it clears the threshold.
///
/// Returns the token's score (the cached one on repeats) and the number of
/// postings written.
fn post(
    index: &mut ScoreIndex,
    seen: &mut AHashMap<String, f64>,
    token: &str,
    id: &DocId,
    partial_score: f64,
    context_score: f64,
    threshold: u8,
) -> (f64, usize) {
    if let Some(&cached) = seen.get(token) {
        return (cached, 0);
    }

    let value = score(partial_score, context_score, threshold);
    seen.insert(token.to_string(), value);

    if admits(value, threshold) {
        index.insert(bucket_of(value), token, id);
        (value, 1)
    } else {
        (value, 0)
    }
}
