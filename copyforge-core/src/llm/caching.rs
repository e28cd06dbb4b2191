//! On-disk completion cache.
//!
//! Entries live under `<cache_dir>/<provider>/<model>/<key>.json` and hold the
//! full request next to the answer. A hit only counts when the stored request
//! equals the incoming one, so a truncated-hash collision falls through to the
//! provider instead of replaying the wrong stage's output.

use super::{CompletionRequest, LlmError, LlmProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    provider: String,
    model: String,
    stored_at: DateTime<Utc>,
    request: CompletionRequest,
    response: String,
}

/// Totals over one provider/model directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Wraps a provider and answers repeated requests from disk.
#[derive(Debug)]
pub struct CachingProvider {
    inner: Box<dyn LlmProvider>,
    root: PathBuf,
}

/// Hex of the first 16 bytes of SHA-256 over every request field.
pub fn request_key(request: &CompletionRequest) -> String {
    let mut hasher = Sha256::new();
    for part in [request.system.as_bytes(), request.user.as_bytes()] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.update(request.max_tokens.to_le_bytes());
    hasher.update(request.temperature.to_bits().to_le_bytes());
    hex::encode(&hasher.finalize()[..16])
}

fn cache_error(e: impl std::fmt::Display) -> LlmError {
    LlmError::CacheError(e.to_string())
}

impl CachingProvider {
    pub fn new(inner: Box<dyn LlmProvider>, root: PathBuf) -> Self {
        Self { inner, root }
    }

    fn entry_dir(&self) -> PathBuf {
        let model = self.inner.model_name().replace(['/', ':', '\\'], "_");
        self.root.join(self.inner.provider_name()).join(model)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.entry_dir().join(key).with_extension("json")
    }

    fn lookup(&self, key: &str, request: &CompletionRequest) -> Option<String> {
        let raw = fs::read_to_string(self.entry_path(key)).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unreadable cache entry");
                return None;
            }
        };
        if entry.request != *request {
            tracing::warn!(key, "Cache key collision, calling provider");
            return None;
        }
        Some(entry.response)
    }

    fn store(&self, key: &str, request: &CompletionRequest, response: &str) -> Result<(), LlmError> {
        fs::create_dir_all(self.entry_dir()).map_err(cache_error)?;

        let entry = CacheEntry {
            provider: self.inner.provider_name().to_string(),
            model: self.inner.model_name().to_string(),
            stored_at: Utc::now(),
            request: request.clone(),
            response: response.to_string(),
        };
        let body = serde_json::to_vec_pretty(&entry).map_err(cache_error)?;

        // Write then rename so a concurrent reader never sees half a file
        let path = self.entry_path(key);
        let partial = path.with_extension("json.partial");
        fs::write(&partial, body).map_err(cache_error)?;
        fs::rename(&partial, &path).map_err(cache_error)
    }

    pub fn stats(&self) -> CacheStats {
        let Ok(dir) = fs::read_dir(self.entry_dir()) else {
            return CacheStats::default();
        };
        dir.filter_map(Result::ok)
            .filter(|e| is_entry(&e.path()))
            .fold(CacheStats::default(), |acc, e| CacheStats {
                entries: acc.entries + 1,
                bytes: acc.bytes + e.metadata().map(|m| m.len()).unwrap_or(0),
            })
    }
}

fn is_entry(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[async_trait]
impl LlmProvider for CachingProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let key = request_key(request);

        if let Some(response) = self.lookup(&key, request) {
            tracing::debug!(provider = self.inner.provider_name(), key = %key, "Completion served from cache");
            return Ok(response);
        }

        // Errors pass straight through and are never written
        let response = self.inner.complete(request).await?;

        match self.store(&key, request, &response) {
            Ok(()) => tracing::debug!(key = %key, "Completion cached"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Could not cache completion"),
        }
        Ok(response)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeProvider;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn request(system: &str, user: &str) -> CompletionRequest {
        CompletionRequest {
            system: system.to_string(),
            user: user.to_string(),
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    /// Lets the test keep a handle on the fake after boxing it.
    #[derive(Debug)]
    struct Shared(Arc<FakeProvider>);

    #[async_trait]
    impl LlmProvider for Shared {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.0.complete(request).await
        }
        fn provider_name(&self) -> &'static str {
            self.0.provider_name()
        }
        fn model_name(&self) -> &str {
            self.0.model_name()
        }
    }

    #[tokio::test]
    async fn second_identical_request_skips_provider() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProvider::with_response("hello", "world"));
        let provider = CachingProvider::new(Box::new(Shared(fake.clone())), dir.path().to_path_buf());

        for _ in 0..2 {
            let answer = provider.complete(&request("sys", "hello there")).await.unwrap();
            assert_eq!(answer, "world");
        }

        assert_eq!(fake.call_count(), 1);
        let stats = provider.stats();
        assert_eq!(stats.entries, 1);
        assert!(stats.bytes > 0);
    }

    #[test]
    fn every_request_field_changes_the_key() {
        let base = request("sys", "hello");
        let mut hotter = base.clone();
        hotter.temperature = 0.9;
        let mut longer = base.clone();
        longer.max_tokens = 1024;

        let keys = [
            request_key(&base),
            request_key(&request("other sys", "hello")),
            request_key(&hotter),
            request_key(&longer),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
        // Field boundaries are part of the key
        assert_ne!(request_key(&request("ab", "c")), request_key(&request("a", "bc")));
    }

    #[tokio::test]
    async fn mismatched_entry_is_not_replayed() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProvider::with_response("hello", "fresh"));
        let provider = CachingProvider::new(Box::new(Shared(fake.clone())), dir.path().to_path_buf());
        let wanted = request("sys", "hello");

        // Plant an entry for a different request under the wanted key
        let planted = CacheEntry {
            provider: "fake".to_string(),
            model: fake.model_name().to_string(),
            stored_at: Utc::now(),
            request: request("sys", "something else"),
            response: "stale".to_string(),
        };
        fs::create_dir_all(provider.entry_dir()).unwrap();
        fs::write(
            provider.entry_path(&request_key(&wanted)),
            serde_json::to_string(&planted).unwrap(),
        )
        .unwrap();

        assert_eq!(provider.complete(&wanted).await.unwrap(), "fresh");
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let fake = FakeProvider::new();
        fake.push_result(Err(LlmError::RequestFailed("down".to_string())));
        let provider = CachingProvider::new(Box::new(fake), dir.path().to_path_buf());

        assert!(provider.complete(&request("s", "u")).await.is_err());
        assert_eq!(provider.stats(), CacheStats::default());
    }
}
