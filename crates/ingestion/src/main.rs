//! NewsRAG Ingestion Job
//!
//! One-shot batch run:
//! 1. Normalizes legacy category metadata
//! 2. Scrapes each configured site
//! 3. Categorizes, embeds and upserts the articles
//! 4. Logs a short inspection of stored sports articles

mod categorize;
mod errors;
mod migrate;
mod processor;
mod scrape;

use categorize::Categorizer;
use newsrag_common::{
    config::AppConfig,
    embeddings::create_embedder,
    llm::create_generator,
    telemetry::init_tracing,
    vector::ChromaStore,
    VERSION,
};
use processor::IngestionPipeline;
use scrape::SiteScraper;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting NewsRAG Ingestion Job v{}", VERSION);

    let embedder = create_embedder(&config.embedding)?;
    info!(model = embedder.model_name(), dimension = embedder.dimension(), "Embedder ready");
    let chroma = Arc::new(ChromaStore::new(config.vector_store.clone(), embedder.clone())?);
    let generator = create_generator(&config.llm)?;

    let scraper = SiteScraper::new(
        &config.ingestion.user_agent,
        Duration::from_secs(config.ingestion.fetch_timeout_secs),
    )?;

    let pipeline = IngestionPipeline::new(
        scraper,
        Categorizer::new(generator),
        embedder,
        chroma.clone(),
        chroma,
        config.ingestion.clone(),
    );

    let report = pipeline.run().await?;
    info!(articles = report.articles_stored, "Scraping completed successfully");

    Ok(())
}
