//! Stage step trait and supporting types.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::extract::parse_or_sentinel;
use crate::outputs::PriorOutputs;
use crate::pipeline::task_marker;
use crate::types::{InitialPayload, Stage};

/// Metadata about a stage step.
#[derive(Debug, Clone)]
pub struct StepMetadata {
    pub stage: Stage,
    /// Human-readable description
    pub description: &'static str,
    /// System instruction sent with every completion for this stage
    pub system_instruction: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Context provided to steps when building their prompt.
pub struct StepContext<'a> {
    /// The payload the run was created with
    pub payload: &'a InitialPayload,
    /// Outputs of the stages that already completed in this run
    pub outputs: &'a PriorOutputs,
}

/// The contract every pipeline stage satisfies.
///
/// Steps never talk to the model themselves. The executor sends the prompt
/// and hands the raw text back to `parse_output`.
pub trait StageStep: Send + Sync {
    /// Return metadata about this step.
    fn metadata(&self) -> StepMetadata;

    /// Build the user prompt from the initial payload and prior outputs.
    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError>;

    /// Turn raw model text into a candidate output.
    ///
    /// Never fails: unparseable text becomes an extraction sentinel, which
    /// `validate_output` then rejects.
    fn parse_output(&self, raw: &str) -> JsonValue {
        parse_or_sentinel(raw)
    }

    /// Structural check on a candidate output.
    fn validate_output(&self, candidate: &JsonValue) -> bool;
}

/// Prefix a prompt body with the stage's task marker.
pub(crate) fn with_marker(stage: Stage, body: &str) -> String {
    format!("{}\n\n{}", task_marker(stage), body.trim())
}

/// JSON rendering of a prior output for embedding in a prompt.
pub(crate) fn embed<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Shared closing instruction appended to every prompt.
pub(crate) const JSON_ONLY: &str =
    "Respond with JSON only, wrapped in a ```json code block. Do not add commentary.";
