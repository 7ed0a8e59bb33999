use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub fetched: usize,
    pub matched: u64,
    pub modified: u64,
}

/// Outcome of a successful execution, one entry per configured collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    pub database: String,
    pub collections: Vec<CollectionReport>,
}

impl MutationReport {
    pub fn modified(&self) -> u64 {
        self.collections.iter().map(|c| c.modified).sum()
    }
}
