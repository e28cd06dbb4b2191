//! In-memory workflow store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{
    apply_run_update, apply_step_update, new_run_records, RunUpdate, StepUpdate, StoreError,
    WorkflowStore,
};
use crate::types::{Run, StepRecord};

#[derive(Debug, Default)]
struct State {
    runs: HashMap<Uuid, Run>,
    steps: HashMap<Uuid, StepRecord>,
    /// Step ids per run, in stage order
    run_steps: HashMap<Uuid, Vec<Uuid>>,
}

/// Mutex-guarded maps. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WorkflowStore for InMemoryStore {
    fn create_run(&self, name: &str, initial_payload: JsonValue) -> Result<Run, StoreError> {
        let (run, steps) = new_run_records(name, initial_payload);
        let mut state = self.state();
        state
            .run_steps
            .insert(run.id, steps.iter().map(|s| s.id).collect());
        for step in steps {
            state.steps.insert(step.id, step);
        }
        state.runs.insert(run.id, run.clone());
        Ok(run)
    }

    fn get_run(&self, run_id: Uuid) -> Result<Run, StoreError> {
        self.state()
            .runs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("run {}", run_id)))
    }

    fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut runs: Vec<Run> = self.state().runs.values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    fn update_run(&self, run_id: Uuid, update: RunUpdate) -> Result<Run, StoreError> {
        let mut state = self.state();
        let run = state
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| StoreError::NotFound(format!("run {}", run_id)))?;
        apply_run_update(run, update)?;
        Ok(run.clone())
    }

    fn update_step(&self, step_id: Uuid, update: StepUpdate) -> Result<StepRecord, StoreError> {
        let mut state = self.state();
        let step = state
            .steps
            .get_mut(&step_id)
            .ok_or_else(|| StoreError::NotFound(format!("step {}", step_id)))?;
        apply_step_update(step, update)?;
        Ok(step.clone())
    }

    fn get_steps_by_run(&self, run_id: Uuid) -> Result<Vec<StepRecord>, StoreError> {
        let state = self.state();
        let ids = state
            .run_steps
            .get(&run_id)
            .ok_or_else(|| StoreError::NotFound(format!("run {}", run_id)))?;
        Ok(ids
            .iter()
            .filter_map(|id| state.steps.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{RunStatus, Stage, StepStatus};

    #[test]
    fn create_and_read_back() {
        let store = InMemoryStore::new();
        let run = store.create_run("launch", json!({"targetGenre": "health"})).unwrap();

        let fetched = store.get_run(run.id).unwrap();
        assert_eq!(fetched, run);

        let steps = store.get_steps_by_run(run.id).unwrap();
        assert_eq!(steps.len(), Stage::ALL.len());
        assert_eq!(steps[0].stage, Stage::MarketResearch);
        assert_eq!(steps[7].stage, Stage::OptimizationArchive);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get_run(Uuid::new_v4()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_step(Uuid::new_v4(), StepUpdate::running()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn updates_are_visible_and_checked() {
        let store = InMemoryStore::new();
        let run = store.create_run("launch", json!({})).unwrap();
        let step_id = store.get_steps_by_run(run.id).unwrap()[0].id;

        store.update_run(run.id, RunUpdate::running()).unwrap();
        let updated = store.update_step(step_id, StepUpdate::running()).unwrap();
        assert_eq!(updated.status, StepStatus::Running);

        assert!(store
            .update_run(run.id, RunUpdate::finished(RunStatus::Completed))
            .is_ok());
        assert!(store.update_run(run.id, RunUpdate::running()).is_err());
    }

    #[test]
    fn runs_are_listed_newest_first() {
        let store = InMemoryStore::new();
        let first = store.create_run("first", json!({})).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.create_run("second", json!({})).unwrap();

        let runs = store.list_runs().unwrap();
        assert_eq!(runs[0].id, second.id);
        assert_eq!(runs[1].id, first.id);
    }
}
