//! BusinessStrategy step - product, funnel and ROI plan.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::outputs::{validate_as, BusinessStrategyOutput};
use crate::pipeline::step::{with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You are a digital product strategist. \
You turn market research into a priced offer with a realistic funnel.";

/// Step that plans the product, its funnel and projected return.
pub struct BusinessStrategyStep;

impl StageStep for BusinessStrategyStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::BusinessStrategy,
            description: "Plan product, funnel and ROI",
            system_instruction: SYSTEM,
            max_tokens: 2048,
            temperature: 0.4,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let research = ctx.outputs.market_research(Stage::BusinessStrategy)?;
        let templates = ctx.outputs.template_optimization(Stage::BusinessStrategy)?;

        let genre = research
            .top_genre()
            .map(|g| g.genre.as_str())
            .unwrap_or("the recommended genre");
        let template_names = templates
            .templates
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.purpose))
            .collect::<Vec<_>>()
            .join("\n");

        let body = format!(
            r#"Build a business strategy for a digital product in "{genre}".

Market summary: {summary}

Available content templates:
{template_names}

Define the product (name, description, price in USD), a funnel with at least one stage, and an ROI projection with revenue, cost and ROI percentage.

{JSON_ONLY}
{{"product": {{"name": "...", "description": "...", "price": 0}}, "funnel": {{"stages": [{{"name": "...", "goal": "..."}}]}}, "roi": {{"projected_revenue": 0, "projected_cost": 0, "roi_percentage": 0}}}}"#,
            summary = research.analysis_summary,
        );
        Ok(with_marker(Stage::BusinessStrategy, &body))
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<BusinessStrategyOutput>(candidate)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::samples::{sample_output, sample_prior_outputs};
    use crate::types::InitialPayload;

    #[test]
    fn needs_both_dependencies() {
        let payload = InitialPayload::default();
        let outputs = sample_prior_outputs(&[Stage::MarketResearch]);
        let err = BusinessStrategyStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingDependency {
                stage: Stage::BusinessStrategy,
                dependency: Stage::TemplateOptimization,
            }
        ));
    }

    #[test]
    fn prompt_names_templates() {
        let payload = InitialPayload::default();
        let outputs =
            sample_prior_outputs(&[Stage::MarketResearch, Stage::TemplateOptimization]);
        let prompt = BusinessStrategyStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap();
        assert!(prompt.contains("Before-After-Bridge"));
    }

    #[test]
    fn funnel_needs_a_stage() {
        let mut value = sample_output(Stage::BusinessStrategy);
        value["funnel"]["stages"] = json!([]);
        assert!(!BusinessStrategyStep.validate_output(&value));
    }

    #[test]
    fn free_product_is_allowed() {
        let mut value = sample_output(Stage::BusinessStrategy);
        value["product"]["price"] = json!(0);
        assert!(BusinessStrategyStep.validate_output(&value));
    }
}
