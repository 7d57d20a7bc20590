//! Vector store abstraction
//!
//! The query path only reads (`VectorStore`); the ingestion job also writes
//! (`VectorIndexWriter`). Chroma is the production backend.

mod chroma;

pub use chroma::ChromaStore;

use crate::errors::Result;
use crate::models::{Category, Document};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Metadata key holding the article category
pub const CATEGORY_FIELD: &str = "categories";

/// Metadata equality constraint applied server-side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityFilter {
    pub field: String,
    pub value: String,
}

impl EqualityFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Filter on the category metadata field
    pub fn category(category: Category) -> Self {
        Self::new(CATEGORY_FIELD, category.as_str())
    }

    /// Chroma `where` clause
    pub fn to_where(&self) -> Value {
        let mut clause = Map::new();
        clause.insert(self.field.clone(), json!({ "$eq": &self.value }));
        Value::Object(clause)
    }
}

/// Read side used by the gateway
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top `k` documents by semantic similarity, in ranked order
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&EqualityFilter>,
    ) -> Result<Vec<Document>>;

    /// Up to `limit` stored documents, unranked
    async fn sample(&self, limit: usize) -> Result<Vec<Document>>;

    /// Number of stored documents
    async fn count(&self) -> Result<usize>;
}

/// A fully prepared entry for the index
#[derive(Debug, Clone)]
pub struct UpsertRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: Map<String, Value>,
}

/// Write side used by the ingestion job
#[async_trait]
pub trait VectorIndexWriter: Send + Sync {
    async fn upsert(&self, records: Vec<UpsertRecord>) -> Result<()>;

    /// Every stored id with its metadata
    async fn all_metadata(&self) -> Result<Vec<(String, Map<String, Value>)>>;

    /// Replace the metadata of existing entries
    async fn update_metadata(&self, entries: Vec<(String, Map<String, Value>)>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter_where_clause() {
        let filter = EqualityFilter::category(Category::Sports);
        assert_eq!(filter.field, "categories");
        assert_eq!(filter.to_where(), json!({"categories": {"$eq": "sports"}}));
    }
}
