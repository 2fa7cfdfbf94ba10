//! Relevance scoring and bucket placement.
//!
//! A posting's score blends where its word sits in the document (earlier
//! words weigh more) with how much of the word the posted fragment covers.
//! The score picks one of [`BUCKET_COUNT`] buckets; only postings scoring at
//! least the index threshold are written.

/// Number of relevance buckets; bucket 9 is the most relevant.
pub const BUCKET_COUNT: usize = 10;

/// Highest bucket index.
pub const MAX_BUCKET: u8 = (BUCKET_COUNT - 1) as u8;

/// Weight given to the partial score when no threshold is configured.
pub const DEFAULT_PARTIAL_WEIGHT: u8 = 6;

/// Position weight of word `position` out of `word_count` words.
pub fn context_score(position: usize, word_count: usize) -> f64 {
    (word_count - position) as f64 / word_count as f64
}

/// Combine a partial score and a context score.
///
/// A zero partial score means the posting is positional only (context
/// index entries) and the context score is used as is.
pub fn score(partial_score: f64, context_score: f64, threshold: u8) -> f64 {
    if partial_score > 0.0 {
        let weight = if threshold != 0 {
            threshold
        } else {
            DEFAULT_PARTIAL_WEIGHT
        } as f64;
        (f64::from(MAX_BUCKET) - weight) * context_score + weight * partial_score
    } else {
        context_score
    }
}

/// Bucket index for a score, rounded half up and clamped to `0..=9`.
pub fn bucket_of(score: f64) -> usize {
    (score + 0.5).floor().clamp(0.0, f64::from(MAX_BUCKET)) as usize
}

/// Whether a score is high enough to be posted.
pub fn admits(score: f64, threshold: u8) -> bool {
    score >= f64::from(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_score() {
        assert_eq!(context_score(0, 4), 1.0);
        assert_eq!(context_score(3, 4), 0.25);
    }

    #[test]
    fn test_score_default_weight() {
        // threshold 0 weighs the partial score by 6 and the context by 3
        assert_eq!(score(1.0, 1.0, 0), 9.0);
        assert_eq!(score(1.0, 0.5, 0), 7.5);
        assert_eq!(score(0.5, 1.0, 0), 6.0);
    }

    #[test]
    fn test_score_with_threshold_weight() {
        assert_eq!(score(1.0, 1.0, 7), 9.0);
        assert_eq!(score(1.0, 0.0, 7), 7.0);
        assert_eq!(score(0.5, 1.0, 9), 4.5);
    }

    #[test]
    fn test_positional_score() {
        assert_eq!(score(0.0, 9.0, 3), 9.0);
        assert_eq!(score(0.0, 7.0, 0), 7.0);
    }

    #[test]
    fn test_bucket_of() {
        assert_eq!(bucket_of(9.0), 9);
        assert_eq!(bucket_of(7.5), 8);
        assert_eq!(bucket_of(7.49), 7);
        assert_eq!(bucket_of(-3.0), 0);
        assert_eq!(bucket_of(12.0), 9);
    }

    #[test]
    fn test_admits() {
        assert!(admits(6.0, 6));
        assert!(!admits(5.99, 6));
        assert!(admits(0.0, 0));
    }
}
