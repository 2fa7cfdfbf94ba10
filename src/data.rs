use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an indexed document.
///
/// Ids are opaque to the index: either an integer or a string, unique per
/// index instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    Int(i64),
    Text(String),
}

impl DocId {
    /// Returns true for ids the index ignores (the empty string).
    pub fn is_blank(&self) -> bool {
        matches!(self, DocId::Text(s) if s.is_empty())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DocId::Int(v) => Some(*v),
            DocId::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DocId::Int(_) => None,
            DocId::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Int(v) => write!(f, "{v}"),
            DocId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DocId {
    fn from(value: i64) -> Self {
        DocId::Int(value)
    }
}

impl From<i32> for DocId {
    fn from(value: i32) -> Self {
        DocId::Int(value as i64)
    }
}

impl From<u32> for DocId {
    fn from(value: u32) -> Self {
        DocId::Int(value as i64)
    }
}

impl From<&str> for DocId {
    fn from(value: &str) -> Self {
        DocId::Text(value.to_string())
    }
}

impl From<String> for DocId {
    fn from(value: String) -> Self {
        DocId::Text(value)
    }
}

impl From<&DocId> for DocId {
    fn from(value: &DocId) -> Self {
        value.clone()
    }
}
