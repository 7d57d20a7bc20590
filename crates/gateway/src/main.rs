//! NewsRAG API Gateway
//!
//! The HTTP entry point for news questions.
//! Handles:
//! - Question answering via the query orchestrator
//! - Health and collection inspection endpoints
//! - Rate limiting and concurrency limits
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use newsrag_common::{
    config::AppConfig,
    embeddings::create_embedder,
    llm::create_generator,
    logstore::create_log_store,
    metrics::{self, METRICS_PREFIX, QUERY_BUCKETS},
    query::OrchestratorOptions,
    telemetry::init_tracing,
    vector::ChromaStore,
    QueryOrchestrator, VectorStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::middleware::{rate_limit_middleware, track_metrics, RateLimitState};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orchestrator: Arc<QueryOrchestrator>,
    pub vector: Arc<dyn VectorStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting NewsRAG API Gateway v{}", newsrag_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    install_metrics_exporter(&config)?;
    metrics::register_metrics();

    // Collaborators
    let embedder = create_embedder(&config.embedding)?;
    let chroma = ChromaStore::new(config.vector_store.clone(), embedder)?;
    match chroma.heartbeat().await {
        Ok(()) => info!(url = %config.vector_store.url, "Chroma reachable"),
        Err(e) => warn!(error = %e, "Chroma not reachable yet, queries will fail until it is"),
    }
    let vector: Arc<dyn VectorStore> = Arc::new(chroma);

    let generator = create_generator(&config.llm)?;
    info!(model = generator.model_name(), "Text generator ready");
    let log_store = create_log_store(&config.database).await;

    let orchestrator = Arc::new(QueryOrchestrator::new(
        vector.clone(),
        generator,
        log_store,
        OrchestratorOptions::from(&config.query),
    ));

    // Create app state
    let state = AppState {
        config: config.clone(),
        orchestrator,
        vector,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = config.bind_address();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Serve Prometheus text exposition on the metrics port (0 disables)
fn install_metrics_exporter(config: &AppConfig) -> anyhow::Result<()> {
    let port = config.observability.metrics_port;
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_query_duration_seconds", METRICS_PREFIX)),
            QUERY_BUCKETS,
        )?
        .install()?;

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        .route("/query", post(handlers::query::query))
        .route("/health", get(handlers::health::health))
        .route("/debug/collection", get(handlers::debug::collection))
        .route_layer(axum::middleware::from_fn(track_metrics));

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let limiter = RateLimitState::new(rate_limit.requests_per_second, rate_limit.burst);
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    let request_timeout = state.config.request_timeout();
    let max_concurrent = state.config.server.max_concurrent_requests.max(1);

    // Compose the app
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                // Request ID first so traces carry it
                .layer(request_id)
                .layer(propagate_id)
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                // Request timeout
                .layer(TimeoutLayer::new(request_timeout))
                // Concurrency limit for backpressure
                .layer(ConcurrencyLimitLayer::new(max_concurrent)),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use newsrag_common::{
        errors::{AppError, Result},
        llm::UnconfiguredGenerator,
        logstore::MemoryLogStore,
        vector::EqualityFilter,
        Document,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    struct FakeStore {
        documents: Vec<Document>,
        fail: bool,
    }

    #[async_trait]
    impl VectorStore for FakeStore {
        async fn similarity_search(
            &self,
            _query: &str,
            k: usize,
            filter: Option<&EqualityFilter>,
        ) -> Result<Vec<Document>> {
            if self.fail {
                return Err(AppError::VectorStore {
                    message: "connection refused".into(),
                });
            }
            Ok(self
                .documents
                .iter()
                .filter(|d| filter.map_or(true, |f| d.category == f.value))
                .take(k)
                .cloned()
                .collect())
        }

        async fn sample(&self, limit: usize) -> Result<Vec<Document>> {
            if self.fail {
                return Err(AppError::VectorStore {
                    message: "connection refused".into(),
                });
            }
            Ok(self.documents.iter().take(limit).cloned().collect())
        }

        async fn count(&self) -> Result<usize> {
            if self.fail {
                return Err(AppError::VectorStore {
                    message: "connection refused".into(),
                });
            }
            Ok(self.documents.len())
        }
    }

    fn article(id: &str, category: &str, body: &str) -> Document {
        Document {
            id: id.to_string(),
            headline: format!("Headline {}", id),
            body: body.to_string(),
            source: "BBC".to_string(),
            category: category.to_string(),
            scraped_at: "2026-10-16T08:00:00".to_string(),
            ..Default::default()
        }
    }

    fn app_with(documents: Vec<Document>, fail: bool, config: AppConfig) -> Router {
        let vector: Arc<dyn VectorStore> = Arc::new(FakeStore { documents, fail });
        let orchestrator = Arc::new(QueryOrchestrator::new(
            vector.clone(),
            Arc::new(UnconfiguredGenerator),
            Arc::new(MemoryLogStore::new()),
            OrchestratorOptions::from(&config.query),
        ));
        create_router(AppState {
            config: Arc::new(config),
            orchestrator,
            vector,
        })
    }

    fn app(documents: Vec<Document>) -> Router {
        app_with(documents, false, AppConfig::default())
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_question_rejected() {
        for body in [r#"{}"#, r#"{"question": ""}"#, r#"{"question": "   "}"#] {
            let response = app(vec![]).oneshot(post_query(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = json_body(response).await;
            assert_eq!(json["error"], "Question is required");
        }
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let response = app(vec![]).oneshot(post_query("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(vec![]).oneshot(post_query(r#"{"question": 42}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_long_question_rejected() {
        let body = serde_json::json!({ "question": "a".repeat(1001) }).to_string();
        let response = app(vec![]).oneshot(post_query(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_answers_with_degraded_summary() {
        let docs = vec![
            article("1", "general", "First body"),
            article("2", "general", "Second body"),
        ];
        let response = app(docs)
            .oneshot(post_query(r#"{"question": "What is new?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["detected_category"], "general");
        assert_eq!(json["total_results"], 2);
        assert_eq!(json["results"][0]["headline"], "Headline 1");
        assert_eq!(json["results"][0]["categories"], "general");
        assert_eq!(json["summary"], "Headline 1 - First body | Headline 2 - Second body");
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_500() {
        let response = app_with(vec![], true, AppConfig::default())
            .oneshot(post_query(r#"{"question": "anything"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_health_reports_documents() {
        let response = app(vec![article("1", "sports", "b")])
            .oneshot(get("/api/v1/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["chroma_connected"], true);
        assert_eq!(json["documents_available"], true);
        assert!(json["timestamp"].is_string());

        let response = app(vec![]).oneshot(get("/api/v1/health")).await.unwrap();
        let json = json_body(response).await;
        assert_eq!(json["documents_available"], false);
    }

    #[tokio::test]
    async fn test_health_unhealthy_when_store_down() {
        let response = app_with(vec![], true, AppConfig::default())
            .oneshot(get("/api/v1/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["chroma_connected"], false);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_debug_collection() {
        let docs = vec![
            article("1", "sports", &"x".repeat(120)),
            article("2", "politics", "short"),
            article("3", "sports", "short"),
            article("4", "", "short"),
        ];
        let response = app(docs).oneshot(get("/api/v1/debug/collection")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["total_documents"], 4);
        assert_eq!(json["sample_documents"].as_array().unwrap().len(), 4);
        assert_eq!(
            json["sample_documents"][0]["content_preview"],
            format!("{}...", "x".repeat(100))
        );
        assert_eq!(json["categories"], serde_json::json!(["general", "politics", "sports"]));
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_with_json() {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = app_with(vec![], false, config);

        let first = app.clone().oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = json_body(second).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_request_id_propagated() {
        let response = app(vec![]).oneshot(get("/api/v1/health")).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
