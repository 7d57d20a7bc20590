//! NewsRAG Common Library
//!
//! Shared code for the NewsRAG services including:
//! - Configuration management
//! - Error types and handling
//! - Domain models (documents, result items, query logs)
//! - Collaborator clients: embeddings, vector store, text generation, log store
//! - The query orchestrator
//! - Metrics and tracing bootstrap

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logstore;
pub mod metrics;
pub mod models;
pub mod query;
pub mod telemetry;
pub mod vector;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use llm::TextGenerator;
pub use logstore::QueryLogStore;
pub use models::{Category, Document, QueryLogRecord, ResultItem};
pub use query::{QueryOrchestrator, QueryOutcome};
pub use vector::VectorStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default chat model used for classification and summaries
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
