//! Sequential stage pipeline for marketing content generation.
//!
//! This module provides a trait-based pipeline where:
//! - Each stage is defined via the `StageStep` trait (prompt, parse, validate)
//! - The fixed stage order lives in `Stage::ALL`; the executor just loops over it
//! - Later stages read earlier outputs through typed `PriorOutputs` accessors

mod executor;
mod registry;
pub mod samples;
mod step;
pub mod steps;

pub use executor::{start_pipeline, PipelineExecutor};
pub use registry::StepRegistry;
pub use step::{StageStep, StepContext, StepMetadata};

use crate::types::Stage;

/// First line of every stage prompt. Identifies the stage a prompt belongs to.
pub fn task_marker(stage: Stage) -> String {
    format!("Task: {}", stage.as_str())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn task_markers_are_unique() {
        let markers: HashSet<_> = Stage::ALL.iter().map(|s| task_marker(*s)).collect();
        assert_eq!(markers.len(), Stage::ALL.len());
    }

    #[test]
    fn no_marker_contains_another() {
        for a in Stage::ALL {
            for b in Stage::ALL {
                if a != b {
                    assert!(!task_marker(*a).contains(&task_marker(*b)));
                }
            }
        }
    }
}
