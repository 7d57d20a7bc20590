//! Collection inspection for operators

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeSet;
use tokio::time::timeout;

use crate::AppState;
use newsrag_common::{
    errors::{AppError, Result},
    models::{Document, DEFAULT_CATEGORY_SENTINEL},
};

const SAMPLE_SIZE: usize = 10;
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Serialize)]
pub struct CollectionReport {
    pub total_documents: usize,
    pub sample_documents: Vec<SampleDocument>,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SampleDocument {
    pub id: String,
    pub headline: String,
    pub category: String,
    pub scraped_at: String,
    pub source: String,
    pub content_preview: String,
}

impl From<&Document> for SampleDocument {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            headline: doc.headline.clone(),
            category: category_label(doc),
            scraped_at: doc.scraped_at.clone(),
            source: doc.source.clone(),
            content_preview: preview(&doc.body),
        }
    }
}

fn category_label(doc: &Document) -> String {
    let category = doc.category.trim();
    if category.is_empty() {
        DEFAULT_CATEGORY_SENTINEL.to_string()
    } else {
        category.to_string()
    }
}

/// First 100 characters, with `...` appended when cut
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Document count, a small sample and the categories seen in it
pub async fn collection(State(state): State<AppState>) -> Result<Json<CollectionReport>> {
    let limit = state.config.query.retrieval_timeout();
    let timed_out = || AppError::VectorStoreTimeout {
        timeout_ms: limit.as_millis() as u64,
    };

    let total_documents = timeout(limit, state.vector.count()).await.map_err(|_| timed_out())??;
    let sample = timeout(limit, state.vector.sample(SAMPLE_SIZE))
        .await
        .map_err(|_| timed_out())??;

    let categories: BTreeSet<String> = sample.iter().map(category_label).collect();

    Ok(Json(CollectionReport {
        total_documents,
        sample_documents: sample.iter().map(SampleDocument::from).collect(),
        categories: categories.into_iter().collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview("short"), "short");
        let exact = "x".repeat(100);
        assert_eq!(preview(&exact), exact);
        let long = "y".repeat(150);
        assert_eq!(preview(&long), format!("{}...", "y".repeat(100)));
    }

    #[test]
    fn test_preview_counts_characters() {
        let text = "é".repeat(101);
        let cut = preview(&text);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_missing_category_labelled_general() {
        let doc = Document {
            id: "1".into(),
            ..Default::default()
        };
        assert_eq!(SampleDocument::from(&doc).category, "general");
    }
}
