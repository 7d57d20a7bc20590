//! Chroma vector store over the v2 REST API
//!
//! Query texts are embedded locally and sent as `query_embeddings`. The
//! collection id is resolved on first use and cached for the lifetime of the
//! store.

use super::{EqualityFilter, UpsertRecord, VectorIndexWriter, VectorStore};
use crate::config::VectorStoreConfig;
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use crate::models::Document;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const INCLUDE_QUERY: [&str; 3] = ["documents", "metadatas", "distances"];
const INCLUDE_GET: [&str; 2] = ["documents", "metadatas"];

/// Chroma-backed store
pub struct ChromaStore {
    client: reqwest::Client,
    config: VectorStoreConfig,
    embedder: Arc<dyn Embedder>,
    collection_id: OnceCell<String>,
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    metadata: Value,
    get_or_create: bool,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_clause: Option<Value>,
    include: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
}

#[derive(Serialize)]
struct GetRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    include: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Map<String, Value>>>>,
}

impl ChromaStore {
    pub fn new(config: VectorStoreConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            embedder,
            collection_id: OnceCell::new(),
        })
    }

    fn database_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}",
            self.config.url.trim_end_matches('/'),
            self.config.tenant,
            self.config.database
        )
    }

    /// Base URL of the collection, creating the collection on first use
    async fn collection_url(&self) -> Result<String> {
        let id = self
            .collection_id
            .get_or_try_init(|| self.get_or_create_collection())
            .await?;
        Ok(format!("{}/collections/{}", self.database_url(), id))
    }

    async fn get_or_create_collection(&self) -> Result<String> {
        let url = format!("{}/collections", self.database_url());
        let request = CreateCollectionRequest {
            name: &self.config.collection,
            metadata: json!({ "hnsw:space": self.config.distance }),
            get_or_create: true,
        };

        let collection: CollectionResponse = self.send_json(self.client.post(&url).json(&request)).await?;
        info!(
            collection = %self.config.collection,
            id = %collection.id,
            "Resolved Chroma collection"
        );
        Ok(collection.id)
    }

    /// Liveness of the Chroma server itself
    pub async fn heartbeat(&self) -> Result<()> {
        let url = format!("{}/api/v2/heartbeat", self.config.url.trim_end_matches('/'));
        let _: Value = self.send_json(self.client.get(&url)).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore {
                message: format!("Chroma error {}: {}", status, body),
            });
        }

        response.json().await.map_err(|e| AppError::VectorStore {
            message: format!("Failed to parse Chroma response: {}", e),
        })
    }

    async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore {
                message: format!("Chroma error {}: {}", status, body),
            });
        }
        Ok(())
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::VectorStoreTimeout {
                timeout_ms: self.config.timeout_secs * 1000,
            }
        } else {
            AppError::VectorStore {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

/// Zip Chroma's parallel arrays into documents
fn zip_documents(
    ids: Vec<String>,
    documents: Option<Vec<Option<String>>>,
    metadatas: Option<Vec<Option<Map<String, Value>>>>,
) -> Vec<Document> {
    let documents = documents.unwrap_or_default();
    let metadatas = metadatas.unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| {
            let text = documents.get(i).and_then(|d| d.as_deref());
            let metadata = metadatas.get(i).and_then(|m| m.as_ref());
            Document::from_metadata(id, text, metadata)
        })
        .collect()
}

fn first_row<T>(rows: Option<Vec<Vec<T>>>) -> Option<Vec<T>> {
    rows.and_then(|r| r.into_iter().next())
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&EqualityFilter>,
    ) -> Result<Vec<Document>> {
        let embedding = self.embedder.embed(query).await?;
        let url = format!("{}/query", self.collection_url().await?);

        let request = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: k,
            where_clause: filter.map(EqualityFilter::to_where),
            include: &INCLUDE_QUERY,
        };

        let response: QueryResponse = self.send_json(self.client.post(&url).json(&request)).await?;
        let ids = response.ids.into_iter().next().unwrap_or_default();
        let documents = zip_documents(
            ids,
            first_row(response.documents),
            first_row(response.metadatas),
        );

        debug!(
            k,
            filtered = filter.is_some(),
            hits = documents.len(),
            "Chroma similarity search"
        );
        Ok(documents)
    }

    async fn sample(&self, limit: usize) -> Result<Vec<Document>> {
        let url = format!("{}/get", self.collection_url().await?);
        let request = GetRequest {
            limit: Some(limit),
            include: &INCLUDE_GET,
        };

        let response: GetResponse = self.send_json(self.client.post(&url).json(&request)).await?;
        Ok(zip_documents(response.ids, response.documents, response.metadatas))
    }

    async fn count(&self) -> Result<usize> {
        let url = format!("{}/count", self.collection_url().await?);
        self.send_json(self.client.get(&url)).await
    }
}

#[async_trait]
impl VectorIndexWriter for ChromaStore {
    async fn upsert(&self, records: Vec<UpsertRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let url = format!("{}/upsert", self.collection_url().await?);
        let count = records.len();

        let mut ids = Vec::with_capacity(count);
        let mut embeddings = Vec::with_capacity(count);
        let mut documents = Vec::with_capacity(count);
        let mut metadatas = Vec::with_capacity(count);
        for record in records {
            ids.push(record.id);
            embeddings.push(record.embedding);
            documents.push(record.document);
            metadatas.push(record.metadata);
        }

        let body = json!({
            "ids": ids,
            "embeddings": embeddings,
            "documents": documents,
            "metadatas": metadatas,
        });

        self.send_empty(self.client.post(&url).json(&body)).await?;
        info!(count, "Upserted records into Chroma");
        Ok(())
    }

    async fn all_metadata(&self) -> Result<Vec<(String, Map<String, Value>)>> {
        let url = format!("{}/get", self.collection_url().await?);
        let request = GetRequest {
            limit: None,
            include: &["metadatas"],
        };

        let response: GetResponse = self.send_json(self.client.post(&url).json(&request)).await?;
        let metadatas = response.metadatas.unwrap_or_default();

        Ok(response
            .ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let metadata = metadatas.get(i).cloned().flatten().unwrap_or_default();
                (id, metadata)
            })
            .collect())
    }

    async fn update_metadata(&self, entries: Vec<(String, Map<String, Value>)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let url = format!("{}/update", self.collection_url().await?);
        let (ids, metadatas): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        let body = json!({ "ids": ids, "metadatas": metadatas });

        self.send_empty(self.client.post(&url).json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;

    #[test]
    fn test_query_response_parsing() {
        let raw = json!({
            "ids": [["a", "b"]],
            "documents": [["A text", null]],
            "metadatas": [[
                {"headline": "A", "categories": "sports", "scraped_at": "2026-10-16T09:00:00"},
                null
            ]],
            "distances": [[0.1, 0.4]]
        });
        let response: QueryResponse = serde_json::from_value(raw).unwrap();
        let ids = response.ids.into_iter().next().unwrap_or_default();
        let docs = zip_documents(ids, first_row(response.documents), first_row(response.metadatas));

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].headline, "A");
        assert_eq!(docs[0].body, "A text");
        assert_eq!(docs[0].category, "sports");
        assert_eq!(docs[1].id, "b");
        assert!(docs[1].headline.is_empty());
    }

    #[test]
    fn test_query_request_omits_missing_filter() {
        let request = QueryRequest {
            query_embeddings: vec![vec![0.5]],
            n_results: 20,
            where_clause: None,
            include: &INCLUDE_QUERY,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("where").is_none());
        assert_eq!(body["n_results"], 20);

        let filter = EqualityFilter::new("categories", "sports");
        let request = QueryRequest {
            where_clause: Some(filter.to_where()),
            ..request
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["where"]["categories"]["$eq"], "sports");
    }

    #[test]
    fn test_database_url() {
        let config = VectorStoreConfig {
            url: "http://chroma:8000/".to_string(),
            ..Default::default()
        };
        let store = ChromaStore::new(config, Arc::new(MockEmbedder::new(8))).unwrap();
        assert_eq!(
            store.database_url(),
            "http://chroma:8000/api/v2/tenants/default_tenant/databases/default_database"
        );
    }
}
