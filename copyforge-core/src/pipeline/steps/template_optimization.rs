//! TemplateOptimization step - designs conversion templates from the classification.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::outputs::{validate_as, TemplateOptimizationOutput, TEMPLATE_COUNT};
use crate::pipeline::step::{embed, with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You are a conversion copywriter who designs reusable content templates.";

/// Step that produces exactly five content templates.
pub struct TemplateOptimizationStep;

impl StageStep for TemplateOptimizationStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::TemplateOptimization,
            description: "Design conversion-focused content templates",
            system_instruction: SYSTEM,
            max_tokens: 3072,
            temperature: 0.5,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let classification = ctx.outputs.nlp_classification(Stage::TemplateOptimization)?;

        let body = format!(
            r#"Design content templates that speak to this audience analysis:

{analysis}

Return exactly {TEMPLATE_COUNT} templates. Each needs a name, the section structure, its purpose and the conversion elements it relies on.

{JSON_ONLY}
{{"templates": [{{"name": "...", "structure": "...", "purpose": "...", "conversion_elements": ["..."]}}]}}"#,
            analysis = embed(classification),
        );
        Ok(with_marker(Stage::TemplateOptimization, &body))
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<TemplateOptimizationOutput>(candidate)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::samples::{sample_prior_outputs, templates};
    use crate::types::InitialPayload;

    #[test]
    fn prompt_embeds_classification() {
        let payload = InitialPayload::default();
        let outputs = sample_prior_outputs(&[Stage::NlpClassification]);
        let prompt = TemplateOptimizationStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap();
        assert!(prompt.contains("no time to exercise"));
        assert!(prompt.contains("exactly 5 templates"));
    }

    #[test]
    fn template_count_must_be_exact() {
        for (count, expected) in [(4, false), (5, true), (6, false)] {
            let value = json!({ "templates": templates(count) });
            assert_eq!(
                TemplateOptimizationStep.validate_output(&value),
                expected,
                "count {}",
                count
            );
        }
    }
}
