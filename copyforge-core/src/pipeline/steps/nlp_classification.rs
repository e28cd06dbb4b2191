//! NlpClassification step - sorts trending phrases into persuasion buckets.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::outputs::{validate_as, NlpClassificationOutput};
use crate::pipeline::step::{with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You are a consumer psychology analyst. \
You classify language by the motivation behind it.";

/// Step that classifies phrases into pain points, desires, benefits and triggers.
pub struct NlpClassificationStep;

impl StageStep for NlpClassificationStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::NlpClassification,
            description: "Classify phrases into pain points, desires, benefits and triggers",
            system_instruction: SYSTEM,
            max_tokens: 2048,
            temperature: 0.3,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let scraped = ctx.outputs.content_scraping(Stage::NlpClassification)?;
        let phrases = scraped
            .trending_phrases
            .iter()
            .map(|p| format!("- {}", p.phrase))
            .collect::<Vec<_>>()
            .join("\n");

        let body = format!(
            r#"Classify the audience language below.

Trending phrases:
{phrases}

Group what these phrases reveal into pain points, desires, benefits and emotional triggers. Every group must have at least one entry. Name the dominant sentiment.

{JSON_ONLY}
{{"pain_points": ["..."], "desires": ["..."], "benefits": ["..."], "emotional_triggers": ["..."], "dominant_sentiment": "..."}}"#
        );
        Ok(with_marker(Stage::NlpClassification, &body))
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<NlpClassificationOutput>(candidate)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::samples::{sample_output, sample_prior_outputs};
    use crate::types::InitialPayload;

    #[test]
    fn prompt_lists_scraped_phrases() {
        let payload = InitialPayload::default();
        let outputs = sample_prior_outputs(&[Stage::MarketResearch, Stage::ContentScraping]);
        let prompt = NlpClassificationStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap();
        assert!(prompt.contains("- morning routine tip #1"));
    }

    #[test]
    fn every_bucket_must_be_present() {
        let mut value = sample_output(Stage::NlpClassification);
        assert!(NlpClassificationStep.validate_output(&value));

        value
            .as_object_mut()
            .unwrap()
            .remove("emotional_triggers");
        assert!(!NlpClassificationStep.validate_output(&value));
    }

    #[test]
    fn sentiment_is_optional() {
        let value = json!({
            "pain_points": ["a"],
            "desires": ["b"],
            "benefits": ["c"],
            "emotional_triggers": ["d"]
        });
        assert!(NlpClassificationStep.validate_output(&value));
    }
}
