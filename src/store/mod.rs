//! Store Module - Document store boundary
//!
//! The registry delegates persistence to a hosted document database; this
//! trait is the whole contract it relies on: insert with a generated id,
//! point reads, merge updates, and equality-filtered queries with optional
//! ordering and a result cap. Backends that cannot serve an ordered query
//! (a missing composite index, typically) report `IndexUnavailable` so
//! callers can fall back to an unordered fetch.

use async_trait::async_trait;

pub mod memory;

pub use memory::MemoryStore;

/// A stored document. Always a JSON object carrying its own `id` field once
/// persisted.
pub type Document = serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("ordering unavailable for this query")]
    IndexUnavailable,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Ordering request for a query.
#[derive(Clone, Debug)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// Equality-filtered query with optional ordering and limit.
#[derive(Clone, Debug, Default)]
pub struct Query {
    pub filters: Vec<(String, serde_json::Value)>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, value: impl Into<serde_json::Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            descending: true,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// The same query with ordering removed, for the unordered fallback.
    pub fn unordered(mut self) -> Self {
        self.order_by = None;
        self
    }
}

/// Async boundary to the document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists a new document, returns the generated id. The stored
    /// document carries the id in its `id` field.
    async fn insert(&self, collection: &str, doc: Document) -> Result<String, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError>;

    /// Merges `patch`'s top-level fields into the existing document and
    /// returns the result. `NotFound` when the id does not resolve.
    async fn update(&self, collection: &str, id: &str, patch: Document)
        -> Result<Document, StoreError>;

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, StoreError>;
}
