//! CopyGeneration step - categorized title hooks.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::outputs::{validate_as, CopyGenerationOutput, MIN_HOOKS_PER_CATEGORY};
use crate::pipeline::step::{with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You write headlines and hooks that earn the click without overpromising.";

/// Step that generates hooks grouped by persuasion category.
pub struct CopyGenerationStep;

impl StageStep for CopyGenerationStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::CopyGeneration,
            description: "Generate categorized title hooks",
            system_instruction: SYSTEM,
            max_tokens: 4096,
            temperature: 0.9,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let content = ctx.outputs.content_creation(Stage::CopyGeneration)?;
        let classification = ctx.outputs.nlp_classification(Stage::CopyGeneration)?;

        let body = format!(
            r#"Write title hooks for this campaign.

Landing page headline: {headline}
Call to action: {cta}
Pain points: {pains}
Desires: {desires}
Emotional triggers: {triggers}

Group the hooks into categories (for example curiosity, urgency, transformation). Every category needs at least {MIN_HOOKS_PER_CATEGORY} hooks.

{JSON_ONLY}
{{"hook_categories": [{{"category": "...", "hooks": ["..."]}}]}}"#,
            headline = content.landing_page.headline,
            cta = content.landing_page.call_to_action,
            pains = classification.pain_points.join("; "),
            desires = classification.desires.join("; "),
            triggers = classification.emotional_triggers.join("; "),
        );
        Ok(with_marker(Stage::CopyGeneration, &body))
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<CopyGenerationOutput>(candidate)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::samples::{hooks, sample_prior_outputs};
    use crate::types::InitialPayload;

    #[test]
    fn prompt_mixes_content_and_classification() {
        let payload = InitialPayload::default();
        let outputs =
            sample_prior_outputs(&[Stage::NlpClassification, Stage::ContentCreation]);
        let prompt = CopyGenerationStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap();
        assert!(prompt.contains("Get your energy back in 30 days"));
        assert!(prompt.contains("confidence; belonging"));
    }

    #[test]
    fn every_category_needs_enough_hooks() {
        let full = json!({ "category": "curiosity", "hooks": hooks("c", MIN_HOOKS_PER_CATEGORY) });
        let short =
            json!({ "category": "urgency", "hooks": hooks("u", MIN_HOOKS_PER_CATEGORY - 1) });

        assert!(CopyGenerationStep.validate_output(&json!({ "hook_categories": [full.clone()] })));
        assert!(!CopyGenerationStep.validate_output(&json!({ "hook_categories": [full, short] })));
        assert!(!CopyGenerationStep.validate_output(&json!({ "hook_categories": [] })));
    }
}
