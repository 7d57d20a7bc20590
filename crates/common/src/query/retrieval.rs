//! Retrieval strategies and post-retrieval filters

use crate::models::{Category, Document};
use crate::vector::EqualityFilter;
use serde::Serialize;

/// How one vector store call was issued
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Server-side metadata equality filter on the category
    Filtered,
    /// Plain similarity search
    Unfiltered,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Filtered => "filtered",
            RetrievalMode::Unfiltered => "unfiltered",
        }
    }
}

/// Ordered strategy chain. The first strategy returning hits wins.
pub fn strategy_chain(filter: Option<&EqualityFilter>) -> Vec<RetrievalMode> {
    match filter {
        Some(_) => vec![RetrievalMode::Filtered, RetrievalMode::Unfiltered],
        None => vec![RetrievalMode::Unfiltered],
    }
}

/// Server-side filter for a detected category. Tokens of two characters or
/// fewer are too vague to constrain retrieval.
pub fn category_filter(category: Category) -> Option<EqualityFilter> {
    if category.as_str().len() > 2 {
        Some(EqualityFilter::category(category))
    } else {
        None
    }
}

/// Keep documents whose category matches, ignoring case
pub fn retain_category(documents: &mut Vec<Document>, category: Category) {
    documents.retain(|doc| doc.has_category(category.as_str()));
}

/// True when the question asks about today's news
pub fn mentions_today(normalized_question: &str) -> bool {
    normalized_question.contains("today")
}

/// Keep documents scraped on `iso_date` (`YYYY-MM-DD`)
pub fn retain_scraped_on(documents: &mut Vec<Document>, iso_date: &str) {
    documents.retain(|doc| doc.scraped_on(iso_date));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, category: &str, scraped_at: &str) -> Document {
        Document {
            id: id.to_string(),
            category: category.to_string(),
            scraped_at: scraped_at.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_strategy_chain() {
        let filter = EqualityFilter::category(Category::Sports);
        assert_eq!(
            strategy_chain(Some(&filter)),
            vec![RetrievalMode::Filtered, RetrievalMode::Unfiltered]
        );
        assert_eq!(strategy_chain(None), vec![RetrievalMode::Unfiltered]);
    }

    #[test]
    fn test_every_category_token_filters() {
        for category in Category::ALL {
            let filter = category_filter(category).unwrap();
            assert_eq!(filter.value, category.as_str());
        }
    }

    #[test]
    fn test_retain_category_ignores_case() {
        let mut docs = vec![
            doc("1", "Sports", ""),
            doc("2", "politics", ""),
            doc("3", " sports ", ""),
            doc("4", "", ""),
        ];
        retain_category(&mut docs, Category::Sports);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_today_filter() {
        assert!(mentions_today("what happened today in sports"));
        assert!(mentions_today("today's headlines"));
        assert!(!mentions_today("latest sports news"));

        let mut docs = vec![
            doc("1", "sports", "2026-10-16T08:00:00"),
            doc("2", "sports", "2026-10-15T23:59:59"),
            doc("3", "sports", ""),
        ];
        retain_scraped_on(&mut docs, "2026-10-16");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "1");
    }
}
