//! Step registry mapping stages to their implementations.

use std::collections::HashMap;

use crate::pipeline::steps::{
    BusinessStrategyStep, ContentCreationStep, ContentScrapingStep, CopyGenerationStep,
    MarketResearchStep, NlpClassificationStep, OptimizationArchiveStep, TemplateOptimizationStep,
};
use crate::pipeline::StageStep;
use crate::types::Stage;

/// Registry that maps each stage to its step implementation.
pub struct StepRegistry {
    steps: HashMap<Stage, Box<dyn StageStep>>,
}

impl StepRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    /// Registry with the built-in step for every stage.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MarketResearchStep));
        registry.register(Box::new(ContentScrapingStep));
        registry.register(Box::new(NlpClassificationStep));
        registry.register(Box::new(TemplateOptimizationStep));
        registry.register(Box::new(BusinessStrategyStep));
        registry.register(Box::new(ContentCreationStep));
        registry.register(Box::new(CopyGenerationStep));
        registry.register(Box::new(OptimizationArchiveStep));
        registry
    }

    /// Register a step implementation, replacing any previous one for its stage.
    pub fn register(&mut self, step: Box<dyn StageStep>) {
        self.steps.insert(step.metadata().stage, step);
    }

    /// Get the step for a stage.
    pub fn get(&self, stage: Stage) -> Option<&dyn StageStep> {
        self.steps.get(&stage).map(|s| s.as_ref())
    }

    /// Stages in `Stage::ALL` with no registered step.
    pub fn missing_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .iter()
            .copied()
            .filter(|stage| !self.steps.contains_key(stage))
            .collect()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
