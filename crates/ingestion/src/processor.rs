//! Ingestion pipeline
//!
//! migrate -> (scrape -> categorize -> embed -> upsert) per site -> dump -> inspect

use crate::categorize::Categorizer;
use crate::errors::Result;
use crate::migrate::migrate_categories;
use crate::scrape::{Article, SiteScraper};
use newsrag_common::config::{IngestionConfig, SiteConfig};
use newsrag_common::metrics;
use newsrag_common::vector::{EqualityFilter, UpsertRecord, VectorIndexWriter, CATEGORY_FIELD};
use newsrag_common::{Category, Embedder, VectorStore};
use serde_json::{json, Map, Value};
use md5::{Digest, Md5};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Stored description length, in characters
const DESCRIPTION_CHARS: usize = 500;
/// Stored image URL length, in characters
const IMAGE_CHARS: usize = 200;
/// Hits logged by the post-run inspection
const INSPECTION_HITS: usize = 5;

/// Totals for one run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestionReport {
    pub migrated: usize,
    pub sites_scraped: usize,
    pub sites_failed: usize,
    pub articles_stored: usize,
}

pub struct IngestionPipeline {
    scraper: SiteScraper,
    categorizer: Categorizer,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndexWriter>,
    store: Arc<dyn VectorStore>,
    config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        scraper: SiteScraper,
        categorizer: Categorizer,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndexWriter>,
        store: Arc<dyn VectorStore>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            scraper,
            categorizer,
            embedder,
            index,
            store,
            config,
        }
    }

    /// Run the whole job. Only migration and dump failures abort it; a failing
    /// site is logged and skipped.
    pub async fn run(&self) -> Result<IngestionReport> {
        let mut report = IngestionReport {
            migrated: migrate_categories(self.index.as_ref()).await?,
            ..Default::default()
        };

        let mut all_articles = Vec::new();
        let pause = Duration::from_millis(self.config.site_pause_ms);

        for (i, site) in self.config.sites.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            match self.process_site(site).await {
                Ok(articles) => {
                    report.sites_scraped += 1;
                    report.articles_stored += articles.len();
                    info!(site = %site.name, articles = articles.len(), "Site processed");
                    all_articles.extend(articles);
                }
                Err(e) => {
                    report.sites_failed += 1;
                    error!(site = %site.name, error = %e, "Failed to process site");
                }
            }
        }

        if all_articles.is_empty() {
            warn!("No articles were scraped from any site");
        }

        if let Some(path) = &self.config.output_path {
            write_articles(path, &all_articles).await?;
            info!(path = %path, articles = all_articles.len(), "Articles written");
        }

        self.inspect().await;

        info!(
            migrated = report.migrated,
            sites_scraped = report.sites_scraped,
            sites_failed = report.sites_failed,
            articles_stored = report.articles_stored,
            "Ingestion completed"
        );
        Ok(report)
    }

    #[instrument(skip(self, site), fields(site = %site.name))]
    async fn process_site(&self, site: &SiteConfig) -> Result<Vec<Article>> {
        let limit = site.limit.min(self.config.max_articles_per_site);
        let mut articles = self.scraper.scrape(site, limit).await?;
        if articles.is_empty() {
            return Ok(articles);
        }

        self.categorizer.categorize_all(&mut articles).await;
        self.store_articles(&articles).await?;
        metrics::record_ingestion(&site.name, articles.len());

        Ok(articles)
    }

    /// Embed and upsert. Re-running on the same articles overwrites them.
    pub async fn store_articles(&self, articles: &[Article]) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = articles.iter().map(Article::text).collect();
        let embeddings = self.embed_texts(&texts).await?;

        let records: Vec<UpsertRecord> = articles
            .iter()
            .zip(texts)
            .zip(embeddings)
            .map(|((article, text), embedding)| UpsertRecord {
                id: article_id(&article.url, &article.headline),
                embedding,
                metadata: article_metadata(article, &text),
                document: text,
            })
            .collect();

        let count = records.len();
        self.index.upsert(records).await?;
        info!(count, "Stored articles");
        Ok(count)
    }

    /// Blank texts get a zero vector instead of a model call
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let non_blank: Vec<String> = texts.iter().filter(|t| !t.trim().is_empty()).cloned().collect();
        let mut embedded = self.embedder.embed_batch(&non_blank).await?.into_iter();

        let dimension = self.embedder.dimension();
        Ok(texts
            .iter()
            .map(|text| {
                if text.trim().is_empty() {
                    vec![0.0; dimension]
                } else {
                    embedded.next().unwrap_or_else(|| vec![0.0; dimension])
                }
            })
            .collect())
    }

    /// Log a few stored sports articles as a smoke check
    async fn inspect(&self) {
        let filter = EqualityFilter::category(Category::Sports);
        match self
            .store
            .similarity_search(Category::Sports.as_str(), INSPECTION_HITS, Some(&filter))
            .await
        {
            Ok(hits) => {
                info!(hits = hits.len(), "Inspecting stored sports articles");
                for (i, doc) in hits.iter().enumerate() {
                    info!(
                        rank = i + 1,
                        headline = %doc.headline,
                        source = %doc.source,
                        category = %doc.category,
                        "Stored article"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Inspection search failed"),
        }
    }
}

/// Stable id: MD5 of `{url}_{headline}`, hex encoded. Collections written by
/// earlier scraper runs use the same key, so re-ingesting overwrites them.
pub fn article_id(url: &str, headline: &str) -> String {
    hex::encode(Md5::digest(format!("{}_{}", url, headline).as_bytes()))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn article_metadata(article: &Article, text: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("headline".into(), json!(article.headline));
    metadata.insert("description".into(), json!(truncate_chars(&article.description, DESCRIPTION_CHARS)));
    metadata.insert("url".into(), json!(article.url));
    metadata.insert("image".into(), json!(truncate_chars(&article.image, IMAGE_CHARS)));
    metadata.insert("source".into(), json!(article.source));
    metadata.insert("scraped_at".into(), json!(article.scraped_at));
    metadata.insert(CATEGORY_FIELD.into(), json!(article.categories.as_str()));
    metadata.insert("text_length".into(), json!(text.chars().count()));
    metadata
}

async fn write_articles(path: &str, articles: &[Article]) -> Result<()> {
    let body = serde_json::to_string_pretty(articles)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::Categorizer;
    use async_trait::async_trait;
    use newsrag_common::embeddings::MockEmbedder;
    use newsrag_common::errors::Result as ServiceResult;
    use newsrag_common::llm::UnconfiguredGenerator;
    use newsrag_common::Document;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndex {
        upserts: Mutex<Vec<UpsertRecord>>,
    }

    #[async_trait]
    impl VectorIndexWriter for RecordingIndex {
        async fn upsert(&self, records: Vec<UpsertRecord>) -> ServiceResult<()> {
            self.upserts.lock().unwrap().extend(records);
            Ok(())
        }

        async fn all_metadata(&self) -> ServiceResult<Vec<(String, Map<String, Value>)>> {
            Ok(Vec::new())
        }

        async fn update_metadata(&self, _entries: Vec<(String, Map<String, Value>)>) -> ServiceResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl VectorStore for RecordingIndex {
        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
            _filter: Option<&EqualityFilter>,
        ) -> ServiceResult<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn sample(&self, _limit: usize) -> ServiceResult<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> ServiceResult<usize> {
            Ok(self.upserts.lock().unwrap().len())
        }
    }

    fn article(headline: &str, description: &str, category: Category) -> Article {
        Article {
            headline: headline.into(),
            description: description.into(),
            url: format!("https://example.com/{}", headline.replace(' ', "-")),
            image: "https://example.com/i.jpg".into(),
            source: "https://example.com/live".into(),
            scraped_at: "2026-10-16T08:00:00Z".into(),
            categories: category,
        }
    }

    fn pipeline(index: Arc<RecordingIndex>, config: IngestionConfig) -> IngestionPipeline {
        IngestionPipeline::new(
            SiteScraper::new("test-agent", Duration::from_secs(1)).unwrap(),
            Categorizer::new(Arc::new(UnconfiguredGenerator)),
            Arc::new(MockEmbedder::new(8)),
            index.clone(),
            index,
            config,
        )
    }

    #[test]
    fn test_article_id_matches_existing_keys() {
        let id = article_id("https://www.bbc.com/news/live/abc", "Cup final");
        assert_eq!(id, "1ad817c81f51f86aac835bd9539a6884");
        assert_ne!(id, article_id("https://www.bbc.com/news/live/abd", "Cup final"));
    }

    #[test]
    fn test_metadata_truncation() {
        let mut long = article("Big story", "", Category::World);
        long.description = "d".repeat(600);
        long.image = "i".repeat(300);

        let metadata = article_metadata(&long, &long.text());
        assert_eq!(metadata["description"].as_str().unwrap().len(), 500);
        assert_eq!(metadata["image"].as_str().unwrap().len(), 200);
        assert_eq!(metadata["categories"], "world");
        assert_eq!(metadata["text_length"], 610);
    }

    #[tokio::test]
    async fn test_store_articles_upserts_records() {
        let index = Arc::new(RecordingIndex::default());
        let pipeline = pipeline(index.clone(), IngestionConfig::default());

        let articles = vec![
            article("Cup final", "Home side win", Category::Sports),
            article("Budget vote", "Parliament passes budget", Category::Politics),
        ];
        let stored = pipeline.store_articles(&articles).await.unwrap();
        assert_eq!(stored, 2);

        let upserts = index.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 2);
        assert_eq!(upserts[0].document, "Cup final Home side win");
        assert_eq!(upserts[0].id, article_id(&articles[0].url, "Cup final"));
        assert_eq!(upserts[0].embedding.len(), 8);
        assert_eq!(upserts[1].metadata["categories"], "politics");
    }

    #[tokio::test]
    async fn test_repeat_store_reuses_ids() {
        let index = Arc::new(RecordingIndex::default());
        let pipeline = pipeline(index.clone(), IngestionConfig::default());
        let articles = vec![article("Cup final", "Home side win", Category::Sports)];

        pipeline.store_articles(&articles).await.unwrap();
        pipeline.store_articles(&articles).await.unwrap();

        let upserts = index.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 2);
        assert_eq!(upserts[0].id, upserts[1].id);
        assert_eq!(upserts[0].id, article_id(&articles[0].url, &articles[0].headline));
        assert_eq!(upserts[0].embedding, upserts[1].embedding);
    }

    #[tokio::test]
    async fn test_unreachable_site_is_skipped() {
        let index = Arc::new(RecordingIndex::default());
        let mut config = IngestionConfig::default();
        config.site_pause_ms = 0;
        for site in config.sites.iter_mut() {
            // nothing listens on port 9 of localhost
            site.url = "http://127.0.0.1:9/live".into();
        }
        let dump = std::env::temp_dir().join(format!("newsrag-ingest-{}.json", std::process::id()));
        config.output_path = Some(dump.to_string_lossy().into_owned());

        let report = pipeline(index.clone(), config).run().await.unwrap();

        assert_eq!(report.sites_scraped, 0);
        assert_eq!(report.sites_failed, 1);
        assert_eq!(report.articles_stored, 0);
        assert!(index.upserts.lock().unwrap().is_empty());

        let written = tokio::fs::read_to_string(&dump).await.unwrap();
        assert_eq!(written.trim(), "[]");
        tokio::fs::remove_file(&dump).await.unwrap();
    }
}
