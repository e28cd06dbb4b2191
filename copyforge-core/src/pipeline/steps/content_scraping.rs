//! ContentScraping step - collects trending phrases for the chosen genre.

use serde_json::{json, Value as JsonValue};

use crate::error::PipelineError;
use crate::extract::parse_or_sentinel;
use crate::outputs::{validate_as, ContentScrapingOutput, MIN_TRENDING_PHRASES};
use crate::pipeline::step::{with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You track what people search for and talk about online. \
You report trending phrases exactly as audiences use them.";

/// Step that gathers trending phrases around the top recommended genre.
pub struct ContentScrapingStep;

impl StageStep for ContentScrapingStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::ContentScraping,
            description: "Collect trending phrases for the top genre",
            system_instruction: SYSTEM,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let research = ctx.outputs.market_research(Stage::ContentScraping)?;
        let genres = research
            .recommended_genres
            .iter()
            .map(|g| format!("- {} (score {})", g.genre, g.score))
            .collect::<Vec<_>>()
            .join("\n");
        let focus = research
            .top_genre()
            .map(|g| g.genre.as_str())
            .unwrap_or("the recommended genres");

        let body = format!(
            r#"List trending phrases for the genre "{focus}".

Recommended genres:
{genres}

Market summary: {summary}

Return at least {MIN_TRENDING_PHRASES} distinct phrases, each with a relevance between 0 and 1, plus the kinds of sources they come from.

{JSON_ONLY}
{{"trending_phrases": [{{"phrase": "...", "relevance": 0.9}}], "sources": ["..."]}}"#,
            summary = research.analysis_summary,
        );
        Ok(with_marker(Stage::ContentScraping, &body))
    }

    /// Accepts plain strings in place of phrase objects, either as a bare
    /// array or inside `trending_phrases`.
    fn parse_output(&self, raw: &str) -> JsonValue {
        match parse_or_sentinel(raw) {
            JsonValue::Array(items) => {
                json!({ "trending_phrases": phrase_objects(items), "sources": [] })
            }
            JsonValue::Object(mut object) => {
                if let Some(JsonValue::Array(items)) = object.get_mut("trending_phrases") {
                    *items = phrase_objects(std::mem::take(items));
                }
                JsonValue::Object(object)
            }
            other => other,
        }
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<ContentScrapingOutput>(candidate)
    }
}

fn phrase_objects(items: Vec<JsonValue>) -> Vec<JsonValue> {
    items
        .into_iter()
        .map(|item| match item {
            JsonValue::String(phrase) => json!({ "phrase": phrase }),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::PriorOutputs;
    use crate::pipeline::samples::{sample_prior_outputs, trending_phrases};
    use crate::types::InitialPayload;

    #[test]
    fn needs_market_research() {
        let payload = InitialPayload::default();
        let outputs = PriorOutputs::new();
        let err = ContentScrapingStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingDependency {
                dependency: Stage::MarketResearch,
                ..
            }
        ));
    }

    #[test]
    fn prompt_focuses_on_top_genre() {
        let payload = InitialPayload::default();
        let outputs = sample_prior_outputs(&[Stage::MarketResearch]);
        let prompt = ContentScrapingStep
            .format_input(&StepContext {
                payload: &payload,
                outputs: &outputs,
            })
            .unwrap();
        assert!(prompt.contains(r#"genre "health""#));
        assert!(prompt.contains("at least 50"));
    }

    #[test]
    fn phrase_count_boundary() {
        let short = json!({ "trending_phrases": trending_phrases(MIN_TRENDING_PHRASES - 1) });
        let exact = json!({ "trending_phrases": trending_phrases(MIN_TRENDING_PHRASES) });
        assert!(!ContentScrapingStep.validate_output(&short));
        assert!(ContentScrapingStep.validate_output(&exact));
    }

    #[test]
    fn bare_string_array_is_normalized() {
        let phrases: Vec<String> = (0..MIN_TRENDING_PHRASES)
            .map(|i| format!("phrase {}", i))
            .collect();
        let raw = serde_json::to_string(&phrases).unwrap();

        let parsed = ContentScrapingStep.parse_output(&raw);
        assert_eq!(parsed["trending_phrases"][0]["phrase"], "phrase 0");
        assert!(ContentScrapingStep.validate_output(&parsed));
    }

    #[test]
    fn string_phrases_inside_object_are_normalized() {
        let mut phrases: Vec<JsonValue> = (0..MIN_TRENDING_PHRASES + 10)
            .map(|i| json!(format!("phrase {}", i)))
            .collect();
        phrases.push(json!({ "phrase": "already shaped", "relevance": 0.4 }));
        let body = json!({ "trending_phrases": phrases, "sources": ["forums"] });
        let raw = format!("```json\n{}\n```", body);

        let parsed = ContentScrapingStep.parse_output(&raw);
        assert_eq!(parsed["trending_phrases"][0]["phrase"], "phrase 0");
        assert_eq!(parsed["trending_phrases"][MIN_TRENDING_PHRASES + 10]["relevance"], 0.4);
        assert_eq!(parsed["sources"], json!(["forums"]));
        assert!(ContentScrapingStep.validate_output(&parsed));
    }
}
