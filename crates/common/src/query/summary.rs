//! Summary prompt and deterministic fallbacks

use crate::models::{Document, ResultItem};

/// Summary for an empty result set. No generation call is made.
pub const NO_ARTICLES_SUMMARY: &str = "No articles found to summarize.";

/// Last resort when neither the model nor the results give anything to say
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable.";

/// Items quoted by the fallback digest
const DIGEST_ITEMS: usize = 2;

pub fn summary_prompt(documents: &[Document]) -> String {
    let articles = documents
        .iter()
        .map(|doc| format!("{}: {}", doc.headline, doc.body))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Summarize the following news articles in 2-3 sentences. \
        Only use facts stated in the articles.\n\n{}",
        articles
    )
}

/// Digest built from the first results when the model cannot summarize
pub fn fallback_digest(results: &[ResultItem]) -> String {
    let digest = results
        .iter()
        .take(DIGEST_ITEMS)
        .map(|item| format!("{} - {}", item.headline, item.description))
        .collect::<Vec<_>>()
        .join(" | ");

    if digest.is_empty() {
        SUMMARY_UNAVAILABLE.to_string()
    } else {
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(headline: &str, description: &str) -> ResultItem {
        ResultItem {
            headline: headline.to_string(),
            description: description.to_string(),
            source: "BBC".to_string(),
            categories: "sports".to_string(),
            scraped_at: "2026-10-16".to_string(),
        }
    }

    #[test]
    fn test_prompt_lists_headline_and_body() {
        let docs = vec![
            Document {
                headline: "Cup final".into(),
                body: "Home side win".into(),
                ..Default::default()
            },
            Document {
                headline: "Transfer".into(),
                body: "Striker signs".into(),
                ..Default::default()
            },
        ];
        let prompt = summary_prompt(&docs);
        assert!(prompt.ends_with("Cup final: Home side win\nTransfer: Striker signs"));
    }

    #[test]
    fn test_digest_uses_first_two_items() {
        let results = vec![item("A", "a"), item("B", "b"), item("C", "c")];
        assert_eq!(fallback_digest(&results), "A - a | B - b");
        assert_eq!(fallback_digest(&results[..1]), "A - a");
    }

    #[test]
    fn test_digest_without_results() {
        assert_eq!(fallback_digest(&[]), SUMMARY_UNAVAILABLE);
    }
}
