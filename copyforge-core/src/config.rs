//! Configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of completion attempts per stage.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between completion attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "fake";

/// Executor settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Completion attempts per stage, at least 1.
    pub max_attempts: u32,
    /// Constant wait between attempts (no backoff).
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `COPYFORGE_MAX_ATTEMPTS`: attempts per stage (default: 3, minimum: 1)
    /// - `COPYFORGE_RETRY_DELAY_MS`: delay between attempts (default: 1000)
    pub fn from_env() -> Self {
        let max_attempts = env::var("COPYFORGE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let retry_delay_ms = env::var("COPYFORGE_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);

        Self::new(max_attempts, Duration::from_millis(retry_delay_ms))
    }

    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

/// Completion provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// "fake" | "claude" | "gemini"
    pub provider: String,
    /// Model override; each provider has its own default.
    pub model: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    /// When set, responses are cached on disk under this directory.
    pub cache_dir: Option<PathBuf>,
}

impl LlmConfig {
    /// Load configuration from environment variables.
    ///
    /// - `COPYFORGE_LLM_PROVIDER`: provider name (default: "fake")
    /// - `COPYFORGE_LLM_MODEL`: model name
    /// - `ANTHROPIC_API_KEY`: required for "claude"
    /// - `GEMINI_API_KEY`: required for "gemini"
    /// - `COPYFORGE_LLM_CACHE_DIR`: enable the response cache (`~` expands to home)
    pub fn from_env() -> Self {
        Self {
            provider: env::var("COPYFORGE_LLM_PROVIDER")
                .unwrap_or_else(|_| DEFAULT_PROVIDER.to_string()),
            model: env::var("COPYFORGE_LLM_MODEL").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            cache_dir: env::var("COPYFORGE_LLM_CACHE_DIR")
                .ok()
                .map(|v| expand_home(&v)),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_clamped_to_one() {
        let config = PipelineConfig::new(0, Duration::ZERO);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn default_is_three_attempts_with_fixed_delay() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_home("data/cache"), PathBuf::from("data/cache"));
    }
}
