//! MarketResearch step - ranks candidate genres for the campaign.

use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::outputs::{validate_as, MarketResearchOutput};
use crate::pipeline::step::{with_marker, JSON_ONLY};
use crate::pipeline::{StageStep, StepContext, StepMetadata};
use crate::types::Stage;

const SYSTEM: &str = "You are a market research analyst for digital content businesses. \
You evaluate niches by demand, competition and monetization potential.";

/// Step that turns the caller's genre and keywords into ranked genre recommendations.
pub struct MarketResearchStep;

impl StageStep for MarketResearchStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            stage: Stage::MarketResearch,
            description: "Rank market genres by opportunity",
            system_instruction: SYSTEM,
            max_tokens: 2048,
            temperature: 0.4,
        }
    }

    fn format_input(&self, ctx: &StepContext<'_>) -> Result<String, PipelineError> {
        let payload = ctx.payload;
        let genre = payload
            .target_genre
            .as_deref()
            .unwrap_or("any profitable niche");
        let keywords = if payload.keywords.is_empty() {
            "none provided".to_string()
        } else {
            payload.keywords.join(", ")
        };
        let audience = payload
            .target_audience
            .as_deref()
            .unwrap_or("general online audience");

        let body = format!(
            r#"Research the market for a new content product.

Target genre: {genre}
Keywords: {keywords}
Target audience: {audience}

Recommend at least one genre, scored from 0 to 100 by opportunity, with reasoning for each score.

{JSON_ONLY}
{{"recommended_genres": [{{"genre": "...", "score": 0, "reasoning": "..."}}], "analysis_summary": "..."}}"#
        );
        Ok(with_marker(Stage::MarketResearch, &body))
    }

    fn validate_output(&self, candidate: &JsonValue) -> bool {
        validate_as::<MarketResearchOutput>(candidate)
    }
}
