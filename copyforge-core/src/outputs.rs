//! Typed stage outputs and the per-run map of outputs produced so far.
//!
//! Every stage output knows its own structural rules (`OutputShape`). Later
//! stages read earlier outputs only through the typed accessors on
//! `PriorOutputs`, which fail with `MissingDependency` instead of defaulting.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::types::Stage;

/// Minimum trending phrases the scraping stage must return.
pub const MIN_TRENDING_PHRASES: usize = 50;

/// Exact number of templates the optimization stage must return.
pub const TEMPLATE_COUNT: usize = 5;

/// Minimum hooks in every copy category.
pub const MIN_HOOKS_PER_CATEGORY: usize = 20;

/// Structural check a deserialized output must pass.
pub trait OutputShape: DeserializeOwned {
    fn is_well_formed(&self) -> bool;
}

/// Deserialize `candidate` as `T` and apply its structural check.
///
/// Null, empty objects and extraction sentinels all fail here because the
/// required fields are missing.
pub fn validate_as<T: OutputShape>(candidate: &JsonValue) -> bool {
    serde_json::from_value::<T>(candidate.clone())
        .map(|output| output.is_well_formed())
        .unwrap_or(false)
}

fn filled(s: &str) -> bool {
    !s.trim().is_empty()
}

fn all_filled(items: &[String]) -> bool {
    items.iter().all(|s| filled(s))
}

fn is_percentage(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

// ============================================================================
// MARKET_RESEARCH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRecommendation {
    pub genre: String,
    /// Market attractiveness, 0-100
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketResearchOutput {
    pub recommended_genres: Vec<GenreRecommendation>,
    pub analysis_summary: String,
}

impl MarketResearchOutput {
    /// The highest-scoring genre.
    pub fn top_genre(&self) -> Option<&GenreRecommendation> {
        self.recommended_genres
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

impl OutputShape for MarketResearchOutput {
    fn is_well_formed(&self) -> bool {
        !self.recommended_genres.is_empty()
            && filled(&self.analysis_summary)
            && self
                .recommended_genres
                .iter()
                .all(|g| filled(&g.genre) && filled(&g.reasoning) && is_percentage(g.score))
    }
}

// ============================================================================
// CONTENT_SCRAPING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingPhrase {
    pub phrase: String,
    #[serde(default)]
    pub relevance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentScrapingOutput {
    pub trending_phrases: Vec<TrendingPhrase>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl OutputShape for ContentScrapingOutput {
    fn is_well_formed(&self) -> bool {
        self.trending_phrases.len() >= MIN_TRENDING_PHRASES
            && self.trending_phrases.iter().all(|p| filled(&p.phrase))
    }
}

// ============================================================================
// NLP_CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlpClassificationOutput {
    pub pain_points: Vec<String>,
    pub desires: Vec<String>,
    pub benefits: Vec<String>,
    pub emotional_triggers: Vec<String>,
    #[serde(default)]
    pub dominant_sentiment: Option<String>,
}

impl NlpClassificationOutput {
    fn buckets(&self) -> [&Vec<String>; 4] {
        [
            &self.pain_points,
            &self.desires,
            &self.benefits,
            &self.emotional_triggers,
        ]
    }
}

impl OutputShape for NlpClassificationOutput {
    fn is_well_formed(&self) -> bool {
        self.buckets()
            .iter()
            .all(|bucket| !bucket.is_empty() && all_filled(bucket))
    }
}

// ============================================================================
// TEMPLATE_OPTIMIZATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTemplate {
    pub name: String,
    pub structure: String,
    pub purpose: String,
    #[serde(default)]
    pub conversion_elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOptimizationOutput {
    pub templates: Vec<ContentTemplate>,
}

impl OutputShape for TemplateOptimizationOutput {
    fn is_well_formed(&self) -> bool {
        self.templates.len() == TEMPLATE_COUNT
            && self
                .templates
                .iter()
                .all(|t| filled(&t.name) && filled(&t.structure) && filled(&t.purpose))
    }
}

// ============================================================================
// BUSINESS_STRATEGY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPlan {
    pub name: String,
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub name: String,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funnel {
    pub stages: Vec<FunnelStage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiProjection {
    pub projected_revenue: f64,
    pub projected_cost: f64,
    pub roi_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessStrategyOutput {
    pub product: ProductPlan,
    pub funnel: Funnel,
    pub roi: RoiProjection,
}

impl OutputShape for BusinessStrategyOutput {
    fn is_well_formed(&self) -> bool {
        filled(&self.product.name)
            && filled(&self.product.description)
            && self.product.price.is_finite()
            && self.product.price >= 0.0
            && !self.funnel.stages.is_empty()
            && self.funnel.stages.iter().all(|s| filled(&s.name))
            && self.roi.projected_revenue.is_finite()
            && self.roi.projected_cost.is_finite()
            && self.roi.roi_percentage.is_finite()
    }
}

// ============================================================================
// CONTENT_CREATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingPage {
    pub headline: String,
    pub body: String,
    pub call_to_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub platform: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCreationOutput {
    pub landing_page: LandingPage,
    pub social_posts: Vec<SocialPost>,
    pub emails: Vec<EmailDraft>,
}

impl OutputShape for ContentCreationOutput {
    fn is_well_formed(&self) -> bool {
        let page = &self.landing_page;
        filled(&page.headline)
            && filled(&page.body)
            && filled(&page.call_to_action)
            && !self.social_posts.is_empty()
            && self.social_posts.iter().all(|p| filled(&p.content))
            && !self.emails.is_empty()
            && self
                .emails
                .iter()
                .all(|e| filled(&e.subject) && filled(&e.body))
    }
}

// ============================================================================
// COPY_GENERATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookCategory {
    pub category: String,
    pub hooks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyGenerationOutput {
    pub hook_categories: Vec<HookCategory>,
}

impl OutputShape for CopyGenerationOutput {
    fn is_well_formed(&self) -> bool {
        !self.hook_categories.is_empty()
            && self.hook_categories.iter().all(|c| {
                filled(&c.category)
                    && c.hooks.len() >= MIN_HOOKS_PER_CATEGORY
                    && all_filled(&c.hooks)
            })
    }
}

// ============================================================================
// OPTIMIZATION_ARCHIVE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub area: String,
    pub action: String,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationArchiveOutput {
    pub summary: String,
    pub performance_score: f64,
    pub key_insights: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

impl OutputShape for OptimizationArchiveOutput {
    fn is_well_formed(&self) -> bool {
        filled(&self.summary)
            && is_percentage(self.performance_score)
            && !self.key_insights.is_empty()
            && all_filled(&self.key_insights)
            && !self.recommendations.is_empty()
            && self
                .recommendations
                .iter()
                .all(|r| filled(&r.area) && filled(&r.action))
    }
}

// ============================================================================
// Sum type and per-run map
// ============================================================================

/// A validated output of any stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    MarketResearch(MarketResearchOutput),
    ContentScraping(ContentScrapingOutput),
    NlpClassification(NlpClassificationOutput),
    TemplateOptimization(TemplateOptimizationOutput),
    BusinessStrategy(BusinessStrategyOutput),
    ContentCreation(ContentCreationOutput),
    CopyGeneration(CopyGenerationOutput),
    OptimizationArchive(OptimizationArchiveOutput),
}

impl StageOutput {
    /// Read `value` as the output type of `stage`.
    pub fn from_value(stage: Stage, value: &JsonValue) -> Result<Self, serde_json::Error> {
        fn read<T: DeserializeOwned>(value: &JsonValue) -> Result<T, serde_json::Error> {
            serde_json::from_value(value.clone())
        }

        Ok(match stage {
            Stage::MarketResearch => StageOutput::MarketResearch(read(value)?),
            Stage::ContentScraping => StageOutput::ContentScraping(read(value)?),
            Stage::NlpClassification => StageOutput::NlpClassification(read(value)?),
            Stage::TemplateOptimization => StageOutput::TemplateOptimization(read(value)?),
            Stage::BusinessStrategy => StageOutput::BusinessStrategy(read(value)?),
            Stage::ContentCreation => StageOutput::ContentCreation(read(value)?),
            Stage::CopyGeneration => StageOutput::CopyGeneration(read(value)?),
            Stage::OptimizationArchive => StageOutput::OptimizationArchive(read(value)?),
        })
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageOutput::MarketResearch(_) => Stage::MarketResearch,
            StageOutput::ContentScraping(_) => Stage::ContentScraping,
            StageOutput::NlpClassification(_) => Stage::NlpClassification,
            StageOutput::TemplateOptimization(_) => Stage::TemplateOptimization,
            StageOutput::BusinessStrategy(_) => Stage::BusinessStrategy,
            StageOutput::ContentCreation(_) => Stage::ContentCreation,
            StageOutput::CopyGeneration(_) => Stage::CopyGeneration,
            StageOutput::OptimizationArchive(_) => Stage::OptimizationArchive,
        }
    }
}

/// Outputs produced so far within one run, keyed by stage.
#[derive(Debug, Clone, Default)]
pub struct PriorOutputs {
    outputs: HashMap<Stage, StageOutput>,
}

macro_rules! prior_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        /// Typed view of this stage's output; `requester` names the stage asking.
        pub fn $fn_name(&self, requester: Stage) -> Result<&$ty, PipelineError> {
            match self.outputs.get(&Stage::$variant) {
                Some(StageOutput::$variant(output)) => Ok(output),
                _ => Err(PipelineError::MissingDependency {
                    stage: requester,
                    dependency: Stage::$variant,
                }),
            }
        }
    };
}

impl PriorOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an output under its own stage. Outputs are never replaced.
    pub fn insert(&mut self, output: StageOutput) {
        self.outputs.entry(output.stage()).or_insert(output);
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.outputs.contains_key(&stage)
    }

    pub fn get(&self, stage: Stage) -> Option<&StageOutput> {
        self.outputs.get(&stage)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    prior_accessor!(market_research, MarketResearch, MarketResearchOutput);
    prior_accessor!(content_scraping, ContentScraping, ContentScrapingOutput);
    prior_accessor!(nlp_classification, NlpClassification, NlpClassificationOutput);
    prior_accessor!(
        template_optimization,
        TemplateOptimization,
        TemplateOptimizationOutput
    );
    prior_accessor!(business_strategy, BusinessStrategy, BusinessStrategyOutput);
    prior_accessor!(content_creation, ContentCreation, ContentCreationOutput);
    prior_accessor!(copy_generation, CopyGeneration, CopyGenerationOutput);
    prior_accessor!(
        optimization_archive,
        OptimizationArchive,
        OptimizationArchiveOutput
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::samples::sample_output;
    use serde_json::json;

    #[test]
    fn samples_are_well_formed_for_every_stage() {
        for stage in Stage::ALL {
            let value = sample_output(*stage);
            let output = StageOutput::from_value(*stage, &value).unwrap();
            assert_eq!(output.stage(), *stage);
        }
    }

    #[test]
    fn top_genre_picks_highest_score() {
        let output: MarketResearchOutput =
            serde_json::from_value(sample_output(Stage::MarketResearch)).unwrap();
        let top = output.top_genre().unwrap();
        assert!(output.recommended_genres.iter().all(|g| g.score <= top.score));
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        let mut value = sample_output(Stage::MarketResearch);
        value["recommended_genres"][0]["score"] = json!(140);
        assert!(!validate_as::<MarketResearchOutput>(&value));
    }

    #[test]
    fn blank_bucket_entries_are_rejected() {
        let mut value = sample_output(Stage::NlpClassification);
        value["desires"] = json!([]);
        assert!(!validate_as::<NlpClassificationOutput>(&value));

        let mut value = sample_output(Stage::NlpClassification);
        value["benefits"] = json!(["   "]);
        assert!(!validate_as::<NlpClassificationOutput>(&value));
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut value = sample_output(Stage::BusinessStrategy);
        value["product"]["price"] = json!(-1.0);
        assert!(!validate_as::<BusinessStrategyOutput>(&value));
    }

    #[test]
    fn accessor_reports_missing_dependency() {
        let prior = PriorOutputs::new();
        match prior.market_research(Stage::ContentScraping) {
            Err(PipelineError::MissingDependency { stage, dependency }) => {
                assert_eq!(stage, Stage::ContentScraping);
                assert_eq!(dependency, Stage::MarketResearch);
            }
            other => panic!("expected MissingDependency, got {:?}", other),
        }
    }

    #[test]
    fn accessor_returns_inserted_output() {
        let mut prior = PriorOutputs::new();
        let output =
            StageOutput::from_value(Stage::MarketResearch, &sample_output(Stage::MarketResearch))
                .unwrap();
        prior.insert(output);

        assert!(prior.contains(Stage::MarketResearch));
        assert_eq!(prior.len(), 1);
        let research = prior.market_research(Stage::ContentScraping).unwrap();
        assert!(!research.recommended_genres.is_empty());
        assert!(prior.content_scraping(Stage::NlpClassification).is_err());
    }

    #[test]
    fn first_output_for_a_stage_is_kept() {
        let mut prior = PriorOutputs::new();
        let first =
            StageOutput::from_value(Stage::MarketResearch, &sample_output(Stage::MarketResearch))
                .unwrap();
        let mut altered = sample_output(Stage::MarketResearch);
        altered["analysis_summary"] = json!("replacement");
        let second = StageOutput::from_value(Stage::MarketResearch, &altered).unwrap();

        prior.insert(first.clone());
        prior.insert(second);
        assert_eq!(prior.get(Stage::MarketResearch), Some(&first));
    }
}
