//! Metrics and observability utilities
//!
//! Metric names share the `newsrag` prefix. The gateway installs the
//! Prometheus exporter; without one, recording is a no-op.

use metrics::{counter, describe_counter, describe_histogram, gauge, describe_gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all NewsRAG metrics
pub const METRICS_PREFIX: &str = "newsrag";

/// Histogram buckets for end-to-end query latency (in seconds).
/// A query makes up to four sequential remote calls, two of them to an LLM.
pub const QUERY_BUCKETS: &[f64] = &[
    0.050,
    0.100,
    0.250,
    0.500,
    1.000,
    2.000,
    4.000,
    8.000,
    15.00,
    30.00,
    60.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Query metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions answered, by detected category"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end question latency in seconds"
    );

    describe_gauge!(
        format!("{}_query_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned for the last question"
    );

    describe_counter!(
        format!("{}_retrieval_attempts_total", METRICS_PREFIX),
        Unit::Count,
        "Vector store retrievals, by strategy and whether they returned hits"
    );

    describe_counter!(
        format!("{}_degraded_total", METRICS_PREFIX),
        Unit::Count,
        "Steps that fell back to defaults (classification, summary, log)"
    );

    // Collaborator metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total text generation requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Text generation latency in seconds"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_articles_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total articles upserted into the vector store"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a completed question
pub fn record_query(duration_secs: f64, category: &str, result_count: usize) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "category" => category.to_string()
    )
    .increment(1);

    histogram!(format!("{}_query_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_query_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Helper to record one retrieval strategy attempt
pub fn record_retrieval(strategy: &str, hits: usize) {
    counter!(
        format!("{}_retrieval_attempts_total", METRICS_PREFIX),
        "strategy" => strategy.to_string(),
        "empty" => (hits == 0).to_string()
    )
    .increment(1);
}

/// Helper to record a degraded step
pub fn record_degraded(step: &str) {
    counter!(
        format!("{}_degraded_total", METRICS_PREFIX),
        "step" => step.to_string()
    )
    .increment(1);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string(),
            "batch" => if batch_size > 1 { "batch" } else { "single" }
        )
        .record(duration_secs);
    }
}

/// Helper to record text generation metrics
pub fn record_generation(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

/// Helper to record ingestion metrics
pub fn record_ingestion(site: &str, articles: usize) {
    counter!(
        format!("{}_articles_ingested_total", METRICS_PREFIX),
        "site" => site.to_string()
    )
    .increment(articles as u64);
}
