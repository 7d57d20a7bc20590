//! Query orchestrator

use super::plan::{classification_prompt, parse_plan, RetrievalPlan};
use super::retrieval::{
    category_filter, mentions_today, retain_category, retain_scraped_on, strategy_chain,
    RetrievalMode,
};
use super::summary::{fallback_digest, summary_prompt, NO_ARTICLES_SUMMARY};
use crate::config::QueryConfig;
use crate::errors::{AppError, Result};
use crate::llm::TextGenerator;
use crate::logstore::QueryLogStore;
use crate::metrics;
use crate::models::{Category, Document, QueryLogRecord, ResultItem};
use crate::vector::{EqualityFilter, VectorStore};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Validation message for an empty question
pub const QUESTION_REQUIRED: &str = "Question is required";

/// Upper bound on results returned for one question
pub const MAX_RESULTS: usize = 5;

/// Upper bound on candidates requested per retrieval attempt
pub const MAX_CANDIDATES: usize = 20;

/// Limits and timeouts for one orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub candidate_count: usize,
    pub max_results: usize,
    pub retrieval_timeout: Duration,
    pub generation_timeout: Duration,
    pub log_timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&QueryConfig::default())
    }
}

impl From<&QueryConfig> for OrchestratorOptions {
    fn from(config: &QueryConfig) -> Self {
        let options = Self {
            candidate_count: config.candidate_count,
            max_results: config.max_results,
            retrieval_timeout: config.retrieval_timeout(),
            generation_timeout: config.generation_timeout(),
            log_timeout: config.log_timeout(),
        }
        .bounded();

        if options.max_results != config.max_results || options.candidate_count != config.candidate_count {
            warn!(
                max_results = options.max_results,
                candidate_count = options.candidate_count,
                "Query limits clamped"
            );
        }
        options
    }
}

impl OrchestratorOptions {
    /// Clamp the limits: `1..=MAX_RESULTS` results, and enough candidates to
    /// fill them without exceeding `MAX_CANDIDATES`
    pub fn bounded(self) -> Self {
        let max_results = self.max_results.clamp(1, MAX_RESULTS);
        Self {
            candidate_count: self.candidate_count.clamp(max_results, MAX_CANDIDATES),
            max_results,
            ..self
        }
    }
}

/// Answer to one question
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub results: Vec<ResultItem>,
    pub summary: String,
    pub detected_category: Category,
    pub plan: RetrievalPlan,
    /// Strategy that produced the hits, `None` when nothing matched
    pub retrieval_mode: Option<RetrievalMode>,
}

/// Stateless between requests; safe to share behind an `Arc`.
pub struct QueryOrchestrator {
    vector: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
    log_store: Arc<dyn QueryLogStore>,
    options: OrchestratorOptions,
}

impl QueryOrchestrator {
    pub fn new(
        vector: Arc<dyn VectorStore>,
        generator: Arc<dyn TextGenerator>,
        log_store: Arc<dyn QueryLogStore>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            vector,
            generator,
            log_store,
            options: options.bounded(),
        }
    }

    /// Answer a question against today's (UTC) news
    pub async fn handle(&self, question: &str) -> Result<QueryOutcome> {
        self.handle_on(question, Utc::now().date_naive()).await
    }

    /// Answer a question as if `today` were the current date
    #[instrument(skip(self, question), fields(question_len = question.len(), category = tracing::field::Empty))]
    pub async fn handle_on(&self, question: &str, today: NaiveDate) -> Result<QueryOutcome> {
        if question.trim().is_empty() {
            return Err(AppError::Validation {
                message: QUESTION_REQUIRED.to_string(),
                field: Some("question".to_string()),
            });
        }

        let start = Instant::now();
        let normalized = question.to_lowercase();
        let today_iso = today.format("%Y-%m-%d").to_string();

        let plan = self.classify(&normalized, &today_iso).await;
        tracing::Span::current().record("category", plan.category.as_str());
        debug!(
            category = %plan.category,
            time_scope = ?plan.time_scope,
            use_fallback = plan.use_fallback,
            "Question classified"
        );

        let filter = category_filter(plan.category);
        let (mut documents, retrieval_mode) = self.retrieve(&normalized, filter.as_ref()).await?;

        if filter.is_some() && retrieval_mode == Some(RetrievalMode::Unfiltered) {
            retain_category(&mut documents, plan.category);
        }

        if mentions_today(&normalized) {
            retain_scraped_on(&mut documents, &today_iso);
        }

        documents.truncate(self.options.max_results);
        let results: Vec<ResultItem> = documents.iter().map(ResultItem::from).collect();

        let summary = self.summarize(&documents, &results).await;
        self.append_log(question, &results, &summary).await;

        metrics::record_query(start.elapsed().as_secs_f64(), plan.category.as_str(), results.len());
        info!(
            category = %plan.category,
            results = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(QueryOutcome {
            results,
            summary,
            detected_category: plan.category,
            plan,
            retrieval_mode,
        })
    }

    async fn classify(&self, normalized: &str, today_iso: &str) -> RetrievalPlan {
        let prompt = classification_prompt(normalized, today_iso);

        let raw = match self.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Classification unavailable, using default plan");
                metrics::record_degraded("classification");
                return RetrievalPlan::default();
            }
        };

        match parse_plan(&raw) {
            Some(plan) => plan,
            None => {
                warn!(answer = %raw, "Classification answer rejected, using default plan");
                metrics::record_degraded("classification");
                RetrievalPlan::default()
            }
        }
    }

    /// Run the strategy chain. Returns the documents and the strategy that
    /// produced them, or `None` when every strategy came back empty.
    async fn retrieve(
        &self,
        query: &str,
        filter: Option<&EqualityFilter>,
    ) -> Result<(Vec<Document>, Option<RetrievalMode>)> {
        for mode in strategy_chain(filter) {
            let applied = match mode {
                RetrievalMode::Filtered => filter,
                RetrievalMode::Unfiltered => None,
            };

            let documents = self.search(query, applied).await?;
            metrics::record_retrieval(mode.as_str(), documents.len());
            debug!(strategy = mode.as_str(), hits = documents.len(), "Retrieval attempt");

            if !documents.is_empty() {
                return Ok((documents, Some(mode)));
            }
        }

        Ok((Vec::new(), None))
    }

    async fn search(&self, query: &str, filter: Option<&EqualityFilter>) -> Result<Vec<Document>> {
        let limit = self.options.retrieval_timeout;
        match timeout(limit, self.vector.similarity_search(query, self.options.candidate_count, filter)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::VectorStoreTimeout {
                timeout_ms: limit.as_millis() as u64,
            }),
        }
    }

    async fn summarize(&self, documents: &[Document], results: &[ResultItem]) -> String {
        if documents.is_empty() {
            return NO_ARTICLES_SUMMARY.to_string();
        }

        match self.generate(&summary_prompt(documents)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Empty summary from model, using digest");
                metrics::record_degraded("summary");
                fallback_digest(results)
            }
            Err(e) => {
                warn!(error = %e, "Summary unavailable, using digest");
                metrics::record_degraded("summary");
                fallback_digest(results)
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let limit = self.options.generation_timeout;
        match timeout(limit, self.generator.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::GenerationTimeout {
                timeout_ms: limit.as_millis() as u64,
            }),
        }
    }

    async fn append_log(&self, question: &str, results: &[ResultItem], summary: &str) {
        let record = QueryLogRecord::new(question, results.to_vec(), summary);
        let limit = self.options.log_timeout;

        match timeout(limit, self.log_store.insert(&record)).await {
            Ok(Ok(())) => debug!(backend = self.log_store.backend(), "Query logged"),
            Ok(Err(e)) => {
                warn!(error = %e, backend = self.log_store.backend(), "Failed to log query");
                metrics::record_degraded("log");
            }
            Err(_) => {
                warn!(
                    timeout_ms = limit.as_millis() as u64,
                    backend = self.log_store.backend(),
                    "Query log write timed out"
                );
                metrics::record_degraded("log");
            }
        }
    }
}
