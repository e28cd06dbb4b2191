//! Well-formed sample outputs for every stage.
//!
//! Used by `FakeProvider::with_pipeline_responses` for offline runs and by
//! tests as the baseline that boundary cases are derived from.

use serde_json::{json, Value as JsonValue};

use crate::outputs::{
    PriorOutputs, StageOutput, MIN_HOOKS_PER_CATEGORY, MIN_TRENDING_PHRASES, TEMPLATE_COUNT,
};
use crate::types::Stage;

const PHRASE_SEEDS: &[&str] = &[
    "morning routine",
    "home workout",
    "meal prep",
    "sleep hygiene",
    "mindful eating",
    "step challenge",
    "protein snacks",
    "desk stretches",
    "habit stacking",
    "recovery day",
];

const TEMPLATE_NAMES: &[&str] = &[
    "Problem-Agitate-Solve",
    "Before-After-Bridge",
    "Features-Advantages-Benefits",
    "Story-Lesson-Offer",
    "Question-Answer-Action",
];

/// A sample output for `stage` that passes that stage's validation.
pub fn sample_output(stage: Stage) -> JsonValue {
    match stage {
        Stage::MarketResearch => market_research(),
        Stage::ContentScraping => content_scraping(),
        Stage::NlpClassification => nlp_classification(),
        Stage::TemplateOptimization => template_optimization(),
        Stage::BusinessStrategy => business_strategy(),
        Stage::ContentCreation => content_creation(),
        Stage::CopyGeneration => copy_generation(),
        Stage::OptimizationArchive => optimization_archive(),
    }
}

/// Prior outputs holding the sample output of each stage in `stages`.
pub fn sample_prior_outputs(stages: &[Stage]) -> PriorOutputs {
    let mut prior = PriorOutputs::new();
    for stage in stages {
        if let Ok(output) = StageOutput::from_value(*stage, &sample_output(*stage)) {
            prior.insert(output);
        }
    }
    prior
}

/// `count` distinct trending phrase entries.
pub fn trending_phrases(count: usize) -> Vec<JsonValue> {
    (0..count)
        .map(|i| {
            let seed = PHRASE_SEEDS[i % PHRASE_SEEDS.len()];
            json!({
                "phrase": format!("{} tip #{}", seed, i + 1),
                "relevance": 1.0 - (i as f64 / (count.max(1) as f64 * 2.0)),
            })
        })
        .collect()
}

/// `count` content templates.
pub fn templates(count: usize) -> Vec<JsonValue> {
    (0..count)
        .map(|i| {
            let name = TEMPLATE_NAMES
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Template {}", i + 1));
            json!({
                "name": name,
                "structure": "Hook, context, proof, offer, call to action",
                "purpose": "Move a cold reader to a first purchase",
                "conversion_elements": ["urgency", "social proof"],
            })
        })
        .collect()
}

/// `count` hooks for one category.
pub fn hooks(category: &str, count: usize) -> Vec<JsonValue> {
    (0..count)
        .map(|i| json!(format!("{} hook {}: the one change that works", category, i + 1)))
        .collect()
}

fn market_research() -> JsonValue {
    json!({
        "recommended_genres": [
            {
                "genre": "health",
                "score": 88,
                "reasoning": "Sustained search demand and repeat purchase behaviour"
            },
            {
                "genre": "personal finance",
                "score": 74,
                "reasoning": "High intent audience with strong affiliate options"
            }
        ],
        "analysis_summary": "Health and fitness content shows the strongest demand with room for niche positioning."
    })
}

fn content_scraping() -> JsonValue {
    json!({
        "trending_phrases": trending_phrases(MIN_TRENDING_PHRASES),
        "sources": ["search trends", "social media", "forums"]
    })
}

fn nlp_classification() -> JsonValue {
    json!({
        "pain_points": ["no time to exercise", "low energy in the afternoon"],
        "desires": ["feel stronger", "build a routine that sticks"],
        "benefits": ["more energy", "better sleep"],
        "emotional_triggers": ["confidence", "belonging"],
        "dominant_sentiment": "hopeful"
    })
}

fn template_optimization() -> JsonValue {
    json!({ "templates": templates(TEMPLATE_COUNT) })
}

fn business_strategy() -> JsonValue {
    json!({
        "product": {
            "name": "30-Day Energy Reset",
            "description": "A guided program of short workouts and simple meal plans",
            "price": 49.0
        },
        "funnel": {
            "stages": [
                { "name": "Awareness", "goal": "Reach busy professionals with short tips" },
                { "name": "Lead capture", "goal": "Offer a free 5-day starter plan" },
                { "name": "Conversion", "goal": "Upgrade starters to the full program" }
            ]
        },
        "roi": {
            "projected_revenue": 24500.0,
            "projected_cost": 6000.0,
            "roi_percentage": 308.3
        }
    })
}

fn content_creation() -> JsonValue {
    json!({
        "landing_page": {
            "headline": "Get your energy back in 30 days",
            "body": "Short workouts and simple meals designed for people with no spare time.",
            "call_to_action": "Start the free 5-day plan"
        },
        "social_posts": [
            { "platform": "instagram", "content": "Ten minutes. No gym. Here is today's routine." },
            { "platform": "twitter", "content": "Afternoon slump? Try this two-minute reset." }
        ],
        "emails": [
            {
                "subject": "Day 1: the ten minute start",
                "body": "Welcome. Today is about one small win before breakfast."
            }
        ]
    })
}

fn copy_generation() -> JsonValue {
    let categories: Vec<JsonValue> = ["curiosity", "urgency", "transformation"]
        .iter()
        .map(|category| {
            json!({
                "category": category,
                "hooks": hooks(category, MIN_HOOKS_PER_CATEGORY),
            })
        })
        .collect();
    json!({ "hook_categories": categories })
}

fn optimization_archive() -> JsonValue {
    json!({
        "summary": "The funnel targets a clear pain point with a low-priced entry offer.",
        "performance_score": 82,
        "key_insights": [
            "Time scarcity is the dominant objection",
            "Transformation hooks fit the landing page headline"
        ],
        "recommendations": [
            { "area": "email", "action": "Add a day 3 testimonial email", "priority": "high" },
            { "area": "pricing", "action": "Test a 39 dollar launch price", "priority": "medium" }
        ]
    })
}
