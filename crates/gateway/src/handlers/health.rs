//! Health check handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use tokio::time::timeout;

use crate::AppState;

/// Probe query sent to the vector store
const PROBE_QUERY: &str = "test";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub chroma_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

/// Readiness probe: one single-result similarity search
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let limit = state.config.query.retrieval_timeout();
    let probe = timeout(limit, state.vector.similarity_search(PROBE_QUERY, 1, None)).await;
    let timestamp = Utc::now().to_rfc3339();

    let failure = match probe {
        Ok(Ok(hits)) => {
            return (
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                    chroma_connected: true,
                    documents_available: Some(!hits.is_empty()),
                    error: None,
                    timestamp,
                }),
            );
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("Vector store probe timed out after {}ms", limit.as_millis()),
    };

    tracing::error!(error = %failure, "Health check failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(HealthResponse {
            status: "unhealthy".to_string(),
            chroma_connected: false,
            documents_available: None,
            error: Some(failure),
            timestamp,
        }),
    )
}
