//! Stage step implementations, one per pipeline stage.

mod business_strategy;
mod content_creation;
mod content_scraping;
mod copy_generation;
mod market_research;
mod nlp_classification;
mod optimization_archive;
mod template_optimization;

pub use business_strategy::BusinessStrategyStep;
pub use content_creation::ContentCreationStep;
pub use content_scraping::ContentScrapingStep;
pub use copy_generation::CopyGenerationStep;
pub use market_research::MarketResearchStep;
pub use nlp_classification::NlpClassificationStep;
pub use optimization_archive::OptimizationArchiveStep;
pub use template_optimization::TemplateOptimizationStep;
