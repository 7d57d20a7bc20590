//! Append-only store for answered queries
//!
//! Postgres in production; an in-memory store when no database is configured
//! or reachable at startup.

use crate::config::DatabaseConfig;
use crate::db::{DbPool, Repository};
use crate::errors::Result;
use crate::models::QueryLogRecord;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[async_trait]
pub trait QueryLogStore: Send + Sync {
    /// Append one record. Must tolerate concurrent callers.
    async fn insert(&self, record: &QueryLogRecord) -> Result<()>;

    /// Backend name, for logs
    fn backend(&self) -> &'static str;
}

/// SeaORM-backed store writing to `query_logs`
pub struct PostgresLogStore {
    repository: Repository,
}

impl PostgresLogStore {
    /// Connect and make sure the table exists
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = DbPool::new(url, config).await?;
        pool.ensure_schema().await?;
        Ok(Self {
            repository: Repository::new(pool),
        })
    }
}

#[async_trait]
impl QueryLogStore for PostgresLogStore {
    async fn insert(&self, record: &QueryLogRecord) -> Result<()> {
        self.repository.insert_query_log(record).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// Process-local store holding the most recent `capacity` records
pub struct MemoryLogStore {
    records: RwLock<VecDeque<QueryLogRecord>>,
    capacity: usize,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::with_capacity(DatabaseConfig::default().memory_log_capacity)
    }
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that keeps at most `capacity` records (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of the retained records, oldest first
    pub async fn records(&self) -> Vec<QueryLogRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl QueryLogStore for MemoryLogStore {
    async fn insert(&self, record: &QueryLogRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Pick the log store for this process. A configured but unreachable database
/// falls back to memory: the query path never depends on the log store.
pub async fn create_log_store(config: &DatabaseConfig) -> Arc<dyn QueryLogStore> {
    match config.url.as_deref() {
        Some(url) if !url.trim().is_empty() => match PostgresLogStore::connect(url, config).await {
            Ok(store) => {
                info!("Query logs persisted to Postgres");
                Arc::new(store)
            }
            Err(e) => {
                warn!(error = %e, "Query log database unavailable, keeping logs in memory");
                Arc::new(MemoryLogStore::with_capacity(config.memory_log_capacity))
            }
        },
        _ => {
            warn!("database.url not set, keeping query logs in memory");
            Arc::new(MemoryLogStore::with_capacity(config.memory_log_capacity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultItem;

    fn record(question: &str) -> QueryLogRecord {
        QueryLogRecord::new(
            question,
            vec![ResultItem {
                headline: "H".into(),
                description: "D".into(),
                source: "S".into(),
                categories: "sports".into(),
                scraped_at: "2026-10-16".into(),
            }],
            "summary",
        )
    }

    #[tokio::test]
    async fn test_memory_store_appends() {
        let store = MemoryLogStore::new();
        assert!(store.is_empty().await);

        store.insert(&record("first")).await.unwrap();
        store.insert(&record("second")).await.unwrap();

        let records = store.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question, "first");
        assert_eq!(records[1].response[0].categories, "sports");
    }

    #[tokio::test]
    async fn test_memory_store_concurrent_appends() {
        let store = Arc::new(MemoryLogStore::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(&record(&format!("q{}", i))).await })
            })
            .collect();

        for handle in handles {
            tokio_test::assert_ok!(handle.await.unwrap());
        }
        assert_eq!(store.len().await, 16);
    }

    #[tokio::test]
    async fn test_memory_store_drops_oldest_past_capacity() {
        let store = MemoryLogStore::with_capacity(3);
        for i in 0..2000 {
            store.insert(&record(&format!("q{}", i))).await.unwrap();
        }

        let questions: Vec<_> = store.records().await.into_iter().map(|r| r.question).collect();
        assert_eq!(questions, vec!["q1997", "q1998", "q1999"]);
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_latest_record() {
        let store = MemoryLogStore::with_capacity(0);
        store.insert(&record("first")).await.unwrap();
        store.insert(&record("second")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.records().await[0].question, "second");
    }

    #[tokio::test]
    async fn test_no_url_falls_back_to_memory() {
        let store = create_log_store(&DatabaseConfig::default()).await;
        assert_eq!(store.backend(), "memory");
    }
}
