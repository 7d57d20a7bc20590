//! Repository pattern for database operations

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use crate::models::QueryLogRecord;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }

    // ========================================================================
    // Query Log Operations
    // ========================================================================

    /// Append one query log row
    pub async fn insert_query_log(&self, record: &QueryLogRecord) -> Result<QueryLog> {
        let row = QueryLogActiveModel {
            id: Set(Uuid::now_v7()),
            question: Set(record.question.clone()),
            response: Set(serde_json::to_value(&record.response)?),
            summary: Set(record.summary.clone()),
            created_at: Set(record.timestamp.into()),
        };

        row.insert(self.conn()).await.map_err(Into::into)
    }
}
