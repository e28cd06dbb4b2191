//! Structural validation of stage outputs across all stages.

use copyforge_core::outputs::{MIN_HOOKS_PER_CATEGORY, MIN_TRENDING_PHRASES, TEMPLATE_COUNT};
use copyforge_core::pipeline::samples::{hooks, sample_output, templates, trending_phrases};
use copyforge_core::{Stage, StageStep, StepRegistry};
use serde_json::{json, Value as JsonValue};

fn step(registry: &StepRegistry, stage: Stage) -> &dyn StageStep {
    registry.get(stage).unwrap()
}

#[test]
fn well_formed_samples_pass_and_empty_values_fail() {
    let registry = StepRegistry::standard();
    for stage in Stage::ALL {
        let step = step(&registry, *stage);
        assert!(step.validate_output(&sample_output(*stage)), "{}", stage);
        assert!(!step.validate_output(&json!({})), "{} accepted {{}}", stage);
        assert!(!step.validate_output(&JsonValue::Null), "{} accepted null", stage);
    }
}

#[test]
fn trending_phrases_minimum() {
    let registry = StepRegistry::standard();
    let scraping = step(&registry, Stage::ContentScraping);

    let below = json!({ "trending_phrases": trending_phrases(MIN_TRENDING_PHRASES - 1) });
    let at = json!({ "trending_phrases": trending_phrases(MIN_TRENDING_PHRASES) });
    let above = json!({ "trending_phrases": trending_phrases(MIN_TRENDING_PHRASES + 10) });

    assert!(!scraping.validate_output(&below));
    assert!(scraping.validate_output(&at));
    assert!(scraping.validate_output(&above));
}

#[test]
fn templates_exact_count() {
    let registry = StepRegistry::standard();
    let optimization = step(&registry, Stage::TemplateOptimization);

    assert!(!optimization.validate_output(&json!({ "templates": templates(TEMPLATE_COUNT - 1) })));
    assert!(optimization.validate_output(&json!({ "templates": templates(TEMPLATE_COUNT) })));
    assert!(!optimization.validate_output(&json!({ "templates": templates(TEMPLATE_COUNT + 1) })));
}

#[test]
fn hooks_minimum_per_category() {
    let registry = StepRegistry::standard();
    let copy = step(&registry, Stage::CopyGeneration);

    let with_hooks = |count: usize| {
        json!({
            "hook_categories": [
                { "category": "curiosity", "hooks": hooks("curiosity", MIN_HOOKS_PER_CATEGORY) },
                { "category": "urgency", "hooks": hooks("urgency", count) }
            ]
        })
    };

    assert!(!copy.validate_output(&with_hooks(MIN_HOOKS_PER_CATEGORY - 1)));
    assert!(copy.validate_output(&with_hooks(MIN_HOOKS_PER_CATEGORY)));
}

#[test]
fn wrong_field_types_fail() {
    let registry = StepRegistry::standard();

    let mut research = sample_output(Stage::MarketResearch);
    research["recommended_genres"][0]["score"] = json!("high");
    assert!(!step(&registry, Stage::MarketResearch).validate_output(&research));

    let mut strategy = sample_output(Stage::BusinessStrategy);
    strategy["product"]["price"] = json!("49 dollars");
    assert!(!step(&registry, Stage::BusinessStrategy).validate_output(&strategy));

    let mut archive = sample_output(Stage::OptimizationArchive);
    archive["key_insights"] = json!("one insight");
    assert!(!step(&registry, Stage::OptimizationArchive).validate_output(&archive));
}

#[test]
fn extra_fields_are_tolerated() {
    let registry = StepRegistry::standard();
    for stage in Stage::ALL {
        let mut value = sample_output(*stage);
        value["notes"] = json!("model commentary");
        assert!(step(&registry, *stage).validate_output(&value), "{}", stage);
    }
}
