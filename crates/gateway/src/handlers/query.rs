//! Question answering handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::AppState;
use newsrag_common::{
    errors::{AppError, Result},
    models::{Category, ResultItem},
    QueryOutcome,
};

/// Longest accepted question, in characters
pub const MAX_QUESTION_CHARS: u64 = 1000;

/// Query request. A missing question is reported by the orchestrator with
/// the same message as a blank one.
#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[serde(default)]
    #[validate(length(max = 1000, message = "Question must be at most 1000 characters"))]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<ResultItem>,
    pub summary: String,
    pub detected_category: Category,
    pub total_results: usize,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            total_results: outcome.results.len(),
            results: outcome.results,
            summary: outcome.summary,
            detected_category: outcome.detected_category,
        }
    }
}

/// Answer a news question
#[instrument(skip(state, payload))]
pub async fn query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation {
        message: rejection.body_text(),
        field: None,
    })?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("question".to_string()),
    })?;

    let question = request.question.unwrap_or_default();
    let outcome = state.orchestrator.handle(&question).await?;

    Ok(Json(QueryResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_limit_matches_constant() {
        let at_limit = QueryRequest {
            question: Some("a".repeat(MAX_QUESTION_CHARS as usize)),
        };
        assert!(at_limit.validate().is_ok());

        let over = QueryRequest {
            question: Some("a".repeat(MAX_QUESTION_CHARS as usize + 1)),
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_missing_question_passes_validation() {
        let request: QueryRequest = serde_json::from_str("{}").unwrap();
        assert!(request.question.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_response_shape() {
        let response = QueryResponse {
            results: vec![],
            summary: "No articles found to summarize.".to_string(),
            detected_category: Category::Sports,
            total_results: 0,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["detected_category"], "sports");
        assert_eq!(json["total_results"], 0);
        assert!(json["results"].as_array().unwrap().is_empty());
    }
}
