//! Fake LLM provider for testing.
//!
//! This provider returns deterministic responses based on prompt matching,
//! allowing tests and offline demos to run without network access or API costs.

use super::{CompletionRequest, LlmError, LlmProvider};
use crate::pipeline::{samples, task_marker};
use crate::types::Stage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A fake LLM provider for testing.
///
/// Scripted results queued with `push_result` are returned first, one per call.
/// After that, responses are matched by checking if the user message contains a
/// registered substring; the first registered match wins. If nothing matches,
/// returns the default response or an error.
#[derive(Debug, Default)]
pub struct FakeProvider {
    /// Results handed out before any pattern matching
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    /// Prompt substring -> response, in registration order
    responses: Vec<(String, String)>,
    /// Default response if no match found
    default_response: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeProvider {
    /// Create a new FakeProvider with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a FakeProvider that returns a specific response for prompts containing a substring.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let mut provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    /// Add a response for prompts containing a specific substring.
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .push((prompt_contains.to_string(), response.to_string()));
    }

    /// Set the default response when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Queue a result to be returned ahead of any matching.
    pub fn push_result(&self, result: Result<String, LlmError>) {
        lock(&self.script).push_back(result);
    }

    /// Create a FakeProvider that answers every pipeline stage with a
    /// well-formed sample output.
    pub fn with_pipeline_responses() -> Self {
        let mut provider = Self::new();
        for stage in Stage::ALL {
            let body = serde_json::to_string_pretty(&samples::sample_output(*stage))
                .unwrap_or_default();
            let fenced = format!("```json\n{}\n```", body);
            provider.add_response(&task_marker(*stage), &fenced);
        }
        provider
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request.clone());

        if let Some(scripted) = lock(&self.script).pop_front() {
            return scripted;
        }

        // Find first matching pattern (case-insensitive)
        let prompt_lower = request.user.to_lowercase();
        for (pattern, response) in &self.responses {
            if prompt_lower.contains(&pattern.to_lowercase()) {
                return Ok(response.clone());
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: No response configured for prompt (first 100 chars): {}",
                request.user.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
