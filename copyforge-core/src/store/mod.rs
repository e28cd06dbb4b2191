//! Persistence for runs and their step records.
//!
//! The executor only talks to the `WorkflowStore` trait. `InMemoryStore` backs
//! tests and throwaway runs; `SqliteStore` is the durable adapter used by the CLI.

mod memory;
mod models;
mod schema;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Run, RunStatus, Stage, StepRecord, StepStatus};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Changes to apply to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunUpdate {
    pub status: RunStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunUpdate {
    pub fn running() -> Self {
        Self {
            status: RunStatus::Running,
            completed_at: None,
        }
    }

    /// Move to a terminal status, stamped now.
    pub fn finished(status: RunStatus) -> Self {
        Self {
            status,
            completed_at: Some(Utc::now()),
        }
    }
}

/// Changes to apply to a step record. `None` fields keep their stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct StepUpdate {
    pub status: StepStatus,
    pub input: Option<JsonValue>,
    pub output: Option<JsonValue>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepUpdate {
    pub fn running() -> Self {
        Self {
            status: StepStatus::Running,
            input: None,
            output: None,
            error: None,
            completed_at: None,
        }
    }

    /// Attach the rendered prompt to a step that is already running.
    pub fn with_input(input: JsonValue) -> Self {
        Self {
            input: Some(input),
            ..Self::running()
        }
    }

    pub fn completed(output: JsonValue) -> Self {
        Self {
            status: StepStatus::Completed,
            output: Some(output),
            completed_at: Some(Utc::now()),
            ..Self::running()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Failed,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
            ..Self::running()
        }
    }
}

/// Abstraction for reading/writing workflow state.
///
/// Every write is committed on its own. Implementations reject status
/// regressions with `StoreError::InvalidTransition`.
pub trait WorkflowStore: Send + Sync {
    /// Create a pending run together with one pending step per stage.
    fn create_run(&self, name: &str, initial_payload: JsonValue) -> Result<Run, StoreError>;

    fn get_run(&self, run_id: Uuid) -> Result<Run, StoreError>;

    /// All runs, newest first.
    fn list_runs(&self) -> Result<Vec<Run>, StoreError>;

    fn update_run(&self, run_id: Uuid, update: RunUpdate) -> Result<Run, StoreError>;

    fn update_step(&self, step_id: Uuid, update: StepUpdate) -> Result<StepRecord, StoreError>;

    /// Steps of a run in stage order.
    fn get_steps_by_run(&self, run_id: Uuid) -> Result<Vec<StepRecord>, StoreError>;
}

/// A new pending run and its pending step records, in stage order.
pub(crate) fn new_run_records(name: &str, initial_payload: JsonValue) -> (Run, Vec<StepRecord>) {
    let now = Utc::now();
    let run = Run {
        id: Uuid::new_v4(),
        name: name.to_string(),
        status: RunStatus::Pending,
        initial_payload,
        created_at: now,
        completed_at: None,
    };
    let steps = Stage::ALL
        .iter()
        .map(|stage| StepRecord {
            id: Uuid::new_v4(),
            run_id: run.id,
            stage: *stage,
            status: StepStatus::Pending,
            input: None,
            output: None,
            error: None,
            created_at: now,
            completed_at: None,
        })
        .collect();
    (run, steps)
}

pub(crate) fn apply_run_update(run: &mut Run, update: RunUpdate) -> Result<(), StoreError> {
    if !run.status.can_transition_to(update.status) {
        return Err(StoreError::InvalidTransition {
            from: run.status.as_str().to_string(),
            to: update.status.as_str().to_string(),
        });
    }
    run.status = update.status;
    if update.completed_at.is_some() {
        run.completed_at = update.completed_at;
    }
    Ok(())
}

pub(crate) fn apply_step_update(step: &mut StepRecord, update: StepUpdate) -> Result<(), StoreError> {
    if !step.status.can_transition_to(update.status) {
        return Err(StoreError::InvalidTransition {
            from: step.status.as_str().to_string(),
            to: update.status.as_str().to_string(),
        });
    }
    step.status = update.status;
    if let Some(input) = update.input {
        step.input = Some(input);
    }
    if let Some(output) = update.output {
        step.output = Some(output);
    }
    if let Some(error) = update.error {
        step.error = Some(error);
    }
    if update.completed_at.is_some() {
        step.completed_at = update.completed_at;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_run_has_one_pending_step_per_stage() {
        let (run, steps) = new_run_records("launch", json!({}));
        assert_eq!(run.status, RunStatus::Pending);
        let stages: Vec<Stage> = steps.iter().map(|s| s.stage).collect();
        assert_eq!(stages, Stage::ALL.to_vec());
        assert!(steps
            .iter()
            .all(|s| s.status == StepStatus::Pending && s.run_id == run.id));
    }

    #[test]
    fn step_update_keeps_unset_fields() {
        let (_, mut steps) = new_run_records("launch", json!({}));
        let step = &mut steps[0];
        apply_step_update(step, StepUpdate::running()).unwrap();
        apply_step_update(step, StepUpdate::with_input(json!({"user": "prompt"}))).unwrap();
        apply_step_update(step, StepUpdate::completed(json!({"ok": true}))).unwrap();

        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.input, Some(json!({"user": "prompt"})));
        assert_eq!(step.output, Some(json!({"ok": true})));
        assert!(step.completed_at.is_some());
        assert!(step.error.is_none());
    }

    #[test]
    fn step_cannot_leave_terminal_state() {
        let (_, mut steps) = new_run_records("launch", json!({}));
        let step = &mut steps[0];
        apply_step_update(step, StepUpdate::running()).unwrap();
        apply_step_update(step, StepUpdate::failed("boom")).unwrap();

        let err = apply_step_update(step, StepUpdate::running()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(step.error.as_deref(), Some("boom"));
    }

    #[test]
    fn pending_run_cannot_complete_directly() {
        let (mut run, _) = new_run_records("launch", json!({}));
        let err = apply_run_update(&mut run, RunUpdate::finished(RunStatus::Completed));
        assert!(err.is_err());
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.completed_at.is_none());
    }
}
