//! ContentCreation step - landing page, social posts and emails.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::outputs::{validate_as, ContentCreationOutput};
use crate::pipeline::step::{embed, with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You are a senior marketing copywriter. \
You write clear, specific copy that follows the given templates.";

/// Step that writes the launch content for the planned product.
pub struct ContentCreationStep;

impl StageStep for ContentCreationStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::ContentCreation,
            description: "Write landing page, social posts and emails",
            system_instruction: SYSTEM,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let strategy = ctx.outputs.business_strategy(Stage::ContentCreation)?;
        let templates = ctx.outputs.template_optimization(Stage::ContentCreation)?;

        let body = format!(
            r#"Write launch content for this product.

Business strategy:
{strategy}

Templates to follow:
{templates}

Produce a landing page (headline, body, call to action), at least one social post with its platform, and at least one email with subject and body.

{JSON_ONLY}
{{"landing_page": {{"headline": "...", "body": "...", "call_to_action": "..."}}, "social_posts": [{{"platform": "...", "content": "..."}}], "emails": [{{"subject": "...", "body": "..."}}]}}"#,
            strategy = embed(strategy),
            templates = embed(&templates.templates),
        );
        Ok(with_marker(Stage::ContentCreation, &body))
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<ContentCreationOutput>(candidate)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::samples::{sample_output, sample_prior_outputs};
    use crate::types::InitialPayload;

    #[test]
    fn prompt_embeds_product() {
        let payload = InitialPayload::default();
        let outputs =
            sample_prior_outputs(&[Stage::TemplateOptimization, Stage::BusinessStrategy]);
        let prompt = ContentCreationStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap();
        assert!(prompt.contains("30-Day Energy Reset"));
    }

    #[test]
    fn needs_an_email() {
        let mut value = sample_output(Stage::ContentCreation);
        assert!(ContentCreationStep.validate_output(&value));

        value["emails"] = json!([]);
        assert!(!ContentCreationStep.validate_output(&value));
    }

    #[test]
    fn landing_page_fields_must_be_filled() {
        let mut value = sample_output(Stage::ContentCreation);
        value["landing_page"]["call_to_action"] = json!("");
        assert!(!ContentCreationStep.validate_output(&value));
    }
}
