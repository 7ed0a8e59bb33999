use std::fmt;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Authentication data handed to the backend on connect.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Update the single document whose `_id` equals `id`, setting `set`'s fields on it.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOne {
    pub id: Bson,
    pub set: Document,
}

/// A failure reported by the server for a batch. `index` is the position of
/// the failed instruction, or `None` when the server rejected the batch as a
/// whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteError {
    pub index: Option<usize>,
    pub code: i32,
    pub message: String,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "update {index} failed ({}): {}", self.code, self.message),
            None => write!(f, "batch failed ({}): {}", self.code, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub acknowledged: bool,
    pub matched: u64,
    pub modified: u64,
    pub write_errors: Vec<WriteError>,
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        self.acknowledged && self.write_errors.is_empty()
    }
}
