//! Zero-shot article categorization through the text generation service

use crate::scrape::Article;
use futures::future::join_all;
use newsrag_common::{Category, TextGenerator};
use std::sync::Arc;
use tracing::{debug, warn};

/// Articles categorized concurrently per round
const BATCH_SIZE: usize = 4;

/// Texts shorter than this many words are not worth a model call
const MIN_WORDS: usize = 3;

pub struct Categorizer {
    generator: Arc<dyn TextGenerator>,
}

impl Categorizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Single best category for `text`; `General` on any failure
    pub async fn categorize(&self, text: &str) -> Category {
        if text.split_whitespace().count() < MIN_WORDS {
            return Category::General;
        }

        match self.generator.generate(&categorization_prompt(text)).await {
            Ok(answer) => parse_label(&answer).unwrap_or_else(|| {
                warn!(answer = %answer, "Unrecognized category label");
                Category::General
            }),
            Err(e) => {
                warn!(error = %e, "Categorization failed");
                Category::General
            }
        }
    }

    /// Categorize articles in place, `BATCH_SIZE` at a time
    pub async fn categorize_all(&self, articles: &mut [Article]) {
        for batch in articles.chunks_mut(BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(Article::text).collect();
            let categories = join_all(texts.iter().map(|text| self.categorize(text))).await;

            for (article, category) in batch.iter_mut().zip(categories) {
                debug!(headline = %article.headline, category = %category, "Categorized");
                article.categories = category;
            }
        }
    }
}

pub fn categorization_prompt(text: &str) -> String {
    format!(
        "Which one of these news categories best describes the text?\n\
        Categories: {}\n\
        Answer with the category name only.\n\n\
        Text: {}",
        Category::prompt_list(),
        text
    )
}

/// Read a category out of a model answer such as `"Sports."` or `world news`
pub fn parse_label(answer: &str) -> Option<Category> {
    let label = answer
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    Category::parse(&label)
}
