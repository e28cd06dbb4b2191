//! OptimizationArchive step - final review of the whole campaign.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::outputs::{validate_as, OptimizationArchiveOutput};
use crate::pipeline::step::{embed, with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You are a growth marketing reviewer. \
You score campaigns honestly and recommend concrete next actions.";

/// Step that scores the campaign and records recommendations.
pub struct OptimizationArchiveStep;

impl StageStep for OptimizationArchiveStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::OptimizationArchive,
            description: "Score the campaign and archive recommendations",
            system_instruction: SYSTEM,
            max_tokens: 2048,
            temperature: 0.3,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let strategy = ctx.outputs.business_strategy(Stage::OptimizationArchive)?;
        let content = ctx.outputs.content_creation(Stage::OptimizationArchive)?;
        let copy = ctx.outputs.copy_generation(Stage::OptimizationArchive)?;

        let categories = copy
            .hook_categories
            .iter()
            .map(|c| format!("- {} ({} hooks)", c.category, c.hooks.len()))
            .collect::<Vec<_>>()
            .join("\n");

        let body = format!(
            r#"Review this campaign before it is archived.

Business strategy:
{strategy}

Content:
{content}

Hook categories:
{categories}

Give a summary, a performance score from 0 to 100, at least one key insight and at least one recommendation (area, action, priority).

{JSON_ONLY}
{{"summary": "...", "performance_score": 0, "key_insights": ["..."], "recommendations": [{{"area": "...", "action": "...", "priority": "high"}}]}}"#,
            strategy = embed(strategy),
            content = embed(content),
        );
        Ok(with_marker(Stage::OptimizationArchive, &body))
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<OptimizationArchiveOutput>(candidate)
    }
}
