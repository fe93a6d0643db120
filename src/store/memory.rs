//! In-memory document store, used by the embedded server mode and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Document, DocumentStore, Query, StoreError};

/// RwLock'd map of collections. Ordered queries can be disabled to mimic a
/// backend without the composite index a query needs.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
    ordered_queries: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            ordered_queries: true,
        }
    }

    /// A store that rejects every ordered query with `IndexUnavailable`.
    pub fn without_ordering() -> Self {
        Self {
            ordered_queries: false,
            ..Self::new()
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(doc: &Document, filters: &[(String, serde_json::Value)]) -> bool {
    filters
        .iter()
        .all(|(field, value)| doc.get(field) == Some(value))
}

fn sort_key(doc: &Document, field: &str) -> String {
    match doc.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, mut doc: Document) -> Result<String, StoreError> {
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::Backend("document must be a JSON object".to_string()))?;

        let id = Uuid::new_v4().to_string();
        obj.insert("id".to_string(), serde_json::Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc);

        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Document, StoreError> {
        let patch = patch
            .as_object()
            .cloned()
            .ok_or_else(|| StoreError::Backend("patch must be a JSON object".to_string()))?;

        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StoreError::NotFound)?;

        let obj = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::Backend("stored document is not an object".to_string()))?;
        for (key, value) in patch {
            if key != "id" {
                obj.insert(key, value);
            }
        }

        Ok(doc.clone())
    }

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, StoreError> {
        if query.order_by.is_some() && !self.ordered_queries {
            return Err(StoreError::IndexUnavailable);
        }

        let collections = self.collections.read().await;
        let mut results: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| matches(doc, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            results.sort_by(|a, b| {
                let (ka, kb) = (sort_key(a, &order.field), sort_key(b, &order.field));
                if order.descending {
                    kb.cmp(&ka)
                } else {
                    ka.cmp(&kb)
                }
            });
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        Ok(results)
    }
}
