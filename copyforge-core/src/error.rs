use thiserror::Error;

use crate::llm::LlmError;
use crate::store::StoreError;
use crate::types::Stage;

/// Message persisted on a step whose output fails validation.
pub const INVALID_OUTPUT_MESSAGE: &str = "Invalid output format";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} requires {dependency} output, which is not available")]
    MissingDependency { stage: Stage, dependency: Stage },

    #[error("Completion failed for {stage} after {attempts} attempt(s): {source}")]
    Completion {
        stage: Stage,
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("No JSON found in model output: {preview}")]
    ExtractionFailed { preview: String },

    #[error("Invalid output format")]
    ValidationFailed { stage: Stage },

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_reads_as_invalid_output() {
        let err = PipelineError::ValidationFailed {
            stage: Stage::MarketResearch,
        };
        assert_eq!(err.to_string(), INVALID_OUTPUT_MESSAGE);
    }

    #[test]
    fn missing_dependency_names_both_stages() {
        let err = PipelineError::MissingDependency {
            stage: Stage::ContentScraping,
            dependency: Stage::MarketResearch,
        };
        let msg = err.to_string();
        assert!(msg.contains("CONTENT_SCRAPING"));
        assert!(msg.contains("MARKET_RESEARCH"));
    }
}
