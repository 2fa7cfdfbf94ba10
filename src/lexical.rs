//! Bucketed lexical index.
//!
//! Postings are spread over ten relevance buckets by a heuristic score that
//! blends word position with fragment completeness. An optional context
//! index records, per word, the words found near it, which lets multi-word
//! queries match word sequences.
//!
//! # Module Structure
//!
//! - `scoring`: scoring formula and bucket placement
//! - `bucket`: `ScoreIndex` and `ContextIndex` storage
//! - `writer`: per-document indexing
//! - `searcher`: query resolution
//! - `intersect`: multi-way intersection with suggestion fallback

pub mod bucket;
pub mod intersect;
pub mod scoring;
pub mod searcher;
pub mod writer;

pub use bucket::{ContextIndex, PostingList, ScoreIndex};
pub use intersect::intersect;
pub use searcher::QueryResolver;
pub use writer::{DocumentWriter, WriteStats};
