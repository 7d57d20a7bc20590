//! Configuration management for NewsRAG services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Conventional variables (PORT, DATABASE_URL, LLM_API_KEY, ...)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Query log database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Vector store (Chroma) configuration
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text generation service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Query orchestration tuning
    #[serde(default)]
    pub query: QueryConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Scraping job configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Query log database URL. Logs are kept in memory when unset.
    pub url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Records kept by the in-memory fallback log store; oldest dropped first
    #[serde(default = "default_memory_log_capacity")]
    pub memory_log_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// Chroma server base URL
    #[serde(default = "default_chroma_url")]
    pub url: String,

    /// Chroma tenant
    #[serde(default = "default_chroma_tenant")]
    pub tenant: String,

    /// Chroma database
    #[serde(default = "default_chroma_database")]
    pub database: String,

    /// Collection holding the scraped articles
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Distance function used when the collection is created
    #[serde(default = "default_distance")]
    pub distance: String,

    /// Request timeout in seconds
    #[serde(default = "default_vector_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (mock provider, empty-text vectors)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API key. Classification and summaries degrade when unset.
    pub api_key: Option<String>,

    /// Chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Candidates requested from the vector store per retrieval (at most 20)
    #[serde(default = "default_candidate_count")]
    pub candidate_count: usize,

    /// Maximum results returned to the caller (at most 5)
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Bound on each retrieval call, in seconds
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_timeout_secs: u64,

    /// Bound on each text generation call, in seconds
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,

    /// Bound on the query log write, in seconds
    #[serde(default = "default_log_timeout")]
    pub log_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Sites to scrape
    #[serde(default = "default_sites")]
    pub sites: Vec<SiteConfig>,

    /// Upper bound on articles taken from one site
    #[serde(default = "default_max_articles_per_site")]
    pub max_articles_per_site: usize,

    /// User agent sent with page fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Page fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Pause between sites in milliseconds
    #[serde(default = "default_site_pause")]
    pub site_pause_ms: u64,

    /// Optional JSON dump of the scraped articles
    pub output_path: Option<String>,
}

/// One scraped site and the CSS selectors locating its articles
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    pub selectors: SiteSelectors,
    #[serde(default = "default_site_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SiteSelectors {
    pub container: String,
    pub headline: String,
    #[serde(default = "default_description_selector")]
    pub description: String,
    #[serde(default = "default_link_selector")]
    pub link: String,
    #[serde(default = "default_image_selector")]
    pub image: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_request_timeout() -> u64 { 60 }
fn default_max_concurrent() -> usize { 100 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_memory_log_capacity() -> usize { 1000 }
fn default_chroma_url() -> String { "http://localhost:8000".to_string() }
fn default_chroma_tenant() -> String { "default_tenant".to_string() }
fn default_chroma_database() -> String { "default_database".to_string() }
fn default_collection() -> String { "news_articles".to_string() }
fn default_distance() -> String { "cosine".to_string() }
fn default_vector_timeout() -> u64 { 15 }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { 1536 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_llm_model() -> String { crate::DEFAULT_CHAT_MODEL.to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> usize { 400 }
fn default_llm_timeout() -> u64 { 30 }
fn default_candidate_count() -> usize { 20 }
fn default_max_results() -> usize { 5 }
fn default_retrieval_timeout() -> u64 { 15 }
fn default_generation_timeout() -> u64 { 20 }
fn default_log_timeout() -> u64 { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "newsrag".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }
fn default_max_articles_per_site() -> usize { 12 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_fetch_timeout() -> u64 { 45 }
fn default_site_pause() -> u64 { 1000 }
fn default_site_limit() -> usize { 12 }
fn default_description_selector() -> String { "p".to_string() }
fn default_link_selector() -> String { "a".to_string() }
fn default_image_selector() -> String { "img".to_string() }

fn default_sites() -> Vec<SiteConfig> {
    vec![SiteConfig {
        name: "bbc_live".to_string(),
        url: "https://www.bbc.com/live".to_string(),
        selectors: SiteSelectors {
            container: ".sc-225578b-0.btdqbl".to_string(),
            headline: ".sc-88db9cf0-13.juUQAL".to_string(),
            description: ".sc-88db9cf0-14.bWanPM".to_string(),
            link: ".sc-8a623a54-0.hMvGwj".to_string(),
            image: ".sc-d1200759-0.dvfjxj".to_string(),
        },
        limit: 12,
    }]
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=5001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // Conventional variables win over everything else
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("llm.api_key", std::env::var("LLM_API_KEY").ok())?
            .set_override_option("embedding.api_key", std::env::var("EMBEDDING_API_KEY").ok())?
            .set_override_option("vector_store.url", std::env::var("CHROMA_URL").ok())?

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Socket address string the gateway binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl QueryConfig {
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn log_timeout(&self) -> Duration {
        Duration::from_secs(self.log_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            memory_log_capacity: default_memory_log_capacity(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_chroma_url(),
            tenant: default_chroma_tenant(),
            database: default_chroma_database(),
            collection: default_collection(),
            distance: default_distance(),
            timeout_secs: default_vector_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            candidate_count: default_candidate_count(),
            max_results: default_max_results(),
            retrieval_timeout_secs: default_retrieval_timeout(),
            generation_timeout_secs: default_generation_timeout(),
            log_timeout_secs: default_log_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            sites: default_sites(),
            max_articles_per_site: default_max_articles_per_site(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout(),
            site_pause_ms: default_site_pause(),
            output_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.vector_store.collection, "news_articles");
        assert_eq!(config.query.candidate_count, 20);
        assert_eq!(config.query.max_results, 5);
        assert!(config.database.url.is_none());
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_default_site_is_bbc_live() {
        let config = AppConfig::default();
        assert_eq!(config.ingestion.sites.len(), 1);
        assert_eq!(config.ingestion.sites[0].name, "bbc_live");
        assert_eq!(config.ingestion.sites[0].limit, 12);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"server": {"port": 7000}, "llm": {"api_key": "k"}}"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.api_key.as_deref(), Some("k"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.query.generation_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }
}
