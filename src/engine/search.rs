use serde::{Deserialize, Serialize};

/// Limit applied when a request does not set one.
pub const DEFAULT_LIMIT: usize = 1000;

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw query text, encoded with the index pipeline before resolution.
    pub query: String,
    /// Maximum number of ids to return. Missing or zero means [`DEFAULT_LIMIT`].
    #[serde(default)]
    pub limit: Option<usize>,
    /// Lowest bucket to scan. Overrides the index threshold when non-zero.
    #[serde(default)]
    pub threshold: Option<u8>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        SearchRequest {
            query: query.into(),
            limit: None,
            threshold: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn effective_limit(&self) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_LIMIT,
        }
    }

    /// The request threshold if set and non-zero, otherwise `index_threshold`.
    pub fn effective_threshold(&self, index_threshold: u8) -> u8 {
        match self.threshold {
            Some(threshold) if threshold > 0 => threshold,
            _ => index_threshold,
        }
    }
}

impl From<&str> for SearchRequest {
    fn from(query: &str) -> Self {
        SearchRequest::new(query)
    }
}

impl From<String> for SearchRequest {
    fn from(query: String) -> Self {
        SearchRequest::new(query)
    }
}

impl From<&String> for SearchRequest {
    fn from(query: &String) -> Self {
        SearchRequest::new(query.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit() {
        assert_eq!(SearchRequest::from("q").effective_limit(), DEFAULT_LIMIT);
        assert_eq!(SearchRequest::from("q").with_limit(0).effective_limit(), DEFAULT_LIMIT);
        assert_eq!(SearchRequest::from("q").with_limit(5).effective_limit(), 5);
    }

    #[test]
    fn test_effective_threshold() {
        let request = SearchRequest::new("q");
        assert_eq!(request.effective_threshold(4), 4);
        assert_eq!(request.clone().with_threshold(0).effective_threshold(4), 4);
        assert_eq!(request.with_threshold(7).effective_threshold(4), 7);
    }

    #[test]
    fn test_request_from_json() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "foo bar", "limit": 10}"#).unwrap();
        assert_eq!(request, SearchRequest::new("foo bar").with_limit(10));
    }
}
