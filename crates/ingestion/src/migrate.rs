//! One-shot rewrite of legacy category metadata
//!
//! Older runs stored `categories` as a JSON array of `{category, confidence}`
//! objects or as a comma-separated list. Everything is rewritten to the single
//! lowercase token the query path filters on.

use crate::errors::Result;
use newsrag_common::vector::{VectorIndexWriter, CATEGORY_FIELD};
use newsrag_common::Category;
use serde_json::Value;
use tracing::{info, warn};

/// Canonical category token for a stored metadata value
pub fn normalize_category(raw: Option<&Value>) -> String {
    let raw = match raw {
        Some(Value::String(s)) => s.trim(),
        Some(Value::Null) | None => "",
        Some(other) => {
            warn!(value = %other, "Non-string category metadata");
            return Category::General.as_str().to_string();
        }
    };

    let label = if raw.starts_with('[') {
        match first_array_category(raw) {
            Some(label) => label,
            None => return Category::General.as_str().to_string(),
        }
    } else if raw.contains(',') {
        raw.split(',').next().unwrap_or_default().trim().to_string()
    } else {
        raw.to_string()
    };

    canonical(&label)
}

fn first_array_category(raw: &str) -> Option<String> {
    let entries: Vec<Value> = serde_json::from_str(raw).ok()?;
    let first = entries.first()?;
    match first {
        Value::Object(entry) => entry.get("category")?.as_str().map(str::to_string),
        Value::String(label) => Some(label.clone()),
        _ => None,
    }
}

/// Known labels map to their token; unknown labels are kept, lowercased
fn canonical(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        return Category::General.as_str().to_string();
    }
    match Category::parse(label) {
        Some(category) => category.as_str().to_string(),
        None => label.to_lowercase(),
    }
}

/// Rewrite every entry whose category is not already canonical.
/// Returns the number of entries updated.
pub async fn migrate_categories(index: &dyn VectorIndexWriter) -> Result<usize> {
    info!("Migrating stored categories");

    let entries = index.all_metadata().await?;
    let total = entries.len();

    let updates: Vec<_> = entries
        .into_iter()
        .filter_map(|(id, mut metadata)| {
            let normalized = normalize_category(metadata.get(CATEGORY_FIELD));
            let unchanged = metadata
                .get(CATEGORY_FIELD)
                .and_then(Value::as_str)
                .is_some_and(|current| current == normalized);
            if unchanged {
                return None;
            }
            metadata.insert(CATEGORY_FIELD.to_string(), Value::String(normalized));
            Some((id, metadata))
        })
        .collect();

    let updated = updates.len();
    if updated > 0 {
        index.update_metadata(updates).await?;
    }

    info!(total, updated, "Category migration completed");
    Ok(updated)
}
