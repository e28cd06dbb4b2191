//! Completion client abstraction over LLM providers.
//!
//! Every pipeline stage talks to the model through `LlmProvider::complete`: one
//! system instruction, one user message, one text answer. Retrying is left to
//! the pipeline executor so each attempt is logged against its stage.

mod caching;
mod claude;
mod fake;
mod gemini;

pub use caching::{CacheStats, CachingProvider};
pub use claude::ClaudeProvider;
pub use fake::FakeProvider;
pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

/// Timeout applied to every HTTP completion call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Cache error: {0}")]
    CacheError(String),
}

/// A single-shot completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for LLM providers.
///
/// Implementations should be stateless and thread-safe. The provider is responsible
/// for making exactly one API call per `complete` and returning the model's text.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Send the request to the LLM and get a text response.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Get the provider name (e.g., "claude", "gemini", "fake").
    fn provider_name(&self) -> &'static str;

    /// Get the model name (e.g., "claude-3-5-sonnet-20241022").
    fn model_name(&self) -> &str;
}

/// Build the provider selected by `COPYFORGE_LLM_PROVIDER`.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, LlmError> {
    create_provider(&LlmConfig::from_env())
}

/// Build a provider from explicit configuration, wrapping it in the disk cache
/// when a cache directory is configured.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let provider: Box<dyn LlmProvider> = match config.provider.as_str() {
        "fake" => Box::new(FakeProvider::with_pipeline_responses()),
        "claude" => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".to_string()))?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| claude::DEFAULT_MODEL.to_string());
            Box::new(ClaudeProvider::new(api_key, model)?)
        }
        "gemini" => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".to_string()))?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
            Box::new(GeminiProvider::new(api_key, model)?)
        }
        other => {
            return Err(LlmError::NotConfigured(format!(
                "Unknown provider: {}",
                other
            )))
        }
    };

    match &config.cache_dir {
        Some(dir) => Ok(Box::new(CachingProvider::new(provider, dir.clone()))),
        None => Ok(provider),
    }
}

/// Shared reqwest client with the completion timeout applied.
fn http_client() -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LlmError::NotConfigured(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            model: None,
            anthropic_api_key: None,
            gemini_api_key: None,
            cache_dir: None,
        }
    }

    #[test]
    fn fake_provider_needs_no_keys() {
        let provider = create_provider(&config("fake")).unwrap();
        assert_eq!(provider.provider_name(), "fake");
    }

    #[test]
    fn claude_without_key_is_not_configured() {
        let err = create_provider(&config("claude")).unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_provider(&config("openai")).unwrap_err();
        assert!(err.to_string().contains("Unknown provider: openai"));
    }

    #[test]
    fn configured_keys_select_default_models() {
        let mut cfg = config("gemini");
        cfg.gemini_api_key = Some("key".to_string());
        let provider = create_provider(&cfg).unwrap();
        assert_eq!(provider.provider_name(), "gemini");
        assert_eq!(provider.model_name(), gemini::DEFAULT_MODEL);
    }
}
