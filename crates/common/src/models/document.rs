//! Retrieved documents and their response projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NO_HEADLINE: &str = "No headline";
pub const NO_DESCRIPTION: &str = "No description";
pub const NO_SOURCE: &str = "Unknown source";
pub const DEFAULT_CATEGORY_SENTINEL: &str = "general";
pub const NO_DATE: &str = "Unknown date";

/// A news article as stored in the vector store. Empty strings mean absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub headline: String,
    pub body: String,
    pub source: String,
    pub category: String,
    /// ISO 8601 timestamp written at scrape time
    pub scraped_at: String,
    pub url: String,
    pub image: String,
}

impl Document {
    /// Build from a vector store hit. `body` prefers the `description`
    /// metadata and falls back to the stored document text.
    pub fn from_metadata(id: String, text: Option<&str>, metadata: Option<&Map<String, Value>>) -> Self {
        let field = |key: &str| -> String {
            metadata
                .and_then(|m| m.get(key))
                .map(metadata_string)
                .unwrap_or_default()
        };

        let mut body = field("description");
        if body.trim().is_empty() {
            body = text.unwrap_or_default().to_string();
        }

        Self {
            id,
            headline: field("headline"),
            body,
            source: field("source"),
            category: field("categories"),
            scraped_at: field("scraped_at"),
            url: field("url"),
            image: field("image"),
        }
    }

    /// Case-insensitive comparison against a category token
    pub fn has_category(&self, token: &str) -> bool {
        self.category.trim().eq_ignore_ascii_case(token)
    }

    /// True when `scraped_at` starts with the given ISO date (`YYYY-MM-DD`)
    pub fn scraped_on(&self, iso_date: &str) -> bool {
        self.scraped_at.starts_with(iso_date)
    }
}

fn metadata_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Response projection of a [`Document`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub headline: String,
    pub description: String,
    pub source: String,
    pub categories: String,
    pub scraped_at: String,
}

impl From<&Document> for ResultItem {
    fn from(doc: &Document) -> Self {
        Self {
            headline: or_sentinel(&doc.headline, NO_HEADLINE),
            description: or_sentinel(&doc.body, NO_DESCRIPTION),
            source: or_sentinel(&doc.source, NO_SOURCE),
            categories: or_sentinel(&doc.category, DEFAULT_CATEGORY_SENTINEL),
            scraped_at: or_sentinel(&doc.scraped_at, NO_DATE),
        }
    }
}

fn or_sentinel(value: &str, sentinel: &str) -> String {
    if value.trim().is_empty() {
        sentinel.to_string()
    } else {
        value.to_string()
    }
}

/// One persisted query, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogRecord {
    pub question: String,
    pub response: Vec<ResultItem>,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl QueryLogRecord {
    pub fn new(question: impl Into<String>, response: Vec<ResultItem>, summary: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            response,
            summary: summary.into(),
            timestamp: Utc::now(),
        }
    }
}
