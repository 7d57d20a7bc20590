//! Text generation client
//!
//! One prompt in, generated text out. Used for query classification,
//! result summaries and article categorization.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SYSTEM_PROMPT: &str = "You are a concise news assistant.";

/// Trait for text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name, for logs and metrics
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completions client
pub struct ChatCompletionGenerator {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<MessageContent>,
}

/// Providers return either a plain string or a list of typed parts
#[derive(Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl ChatCompletionGenerator {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { config, api_key, client })
    }

    async fn call(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self.client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::GenerationTimeout { timeout_ms: self.config.timeout_secs * 1000 }
                } else {
                    AppError::Generation { message: format!("LLM API request failed: {}", e) }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await
            .map_err(|e| AppError::Generation {
                message: format!("Failed to parse LLM response: {}", e),
            })?;

        chat_response.choices.into_iter().next()
            .and_then(|c| c.message.content)
            .map(MessageContent::into_text)
            .ok_or_else(|| AppError::Generation {
                message: "Empty response from LLM".to_string(),
            })
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let result = self.call(prompt).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), &self.config.model, result.is_ok());
        result
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Stand-in when no API key is configured. Every call fails, so callers
/// take their degraded path.
pub struct UnconfiguredGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(AppError::Generation {
            message: "text generation is not configured (llm.api_key unset)".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(Arc::new(ChatCompletionGenerator::new(
            config.clone(),
            key.to_string(),
        )?)),
        _ => {
            tracing::warn!("LLM API key not configured, classification and summaries will degrade");
            Ok(Arc::new(UnconfiguredGenerator))
        }
    }
}
