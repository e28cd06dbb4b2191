//! Pipeline executor.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extract::{preview, sentinel_error};
use crate::llm::{CompletionRequest, LlmProvider};
use crate::outputs::{PriorOutputs, StageOutput};
use crate::pipeline::{StageStep, StepContext, StepRegistry};
use crate::store::{RunUpdate, StepUpdate, StoreError, WorkflowStore};
use crate::types::{InitialPayload, RunStatus, Stage, StepRecord, StepStatus};

/// Drives runs through the fixed stage sequence.
///
/// One executor can serve many runs at once; each run keeps its own
/// `PriorOutputs`, so nothing mutable is shared between them.
pub struct PipelineExecutor {
    store: Arc<dyn WorkflowStore>,
    provider: Arc<dyn LlmProvider>,
    registry: StepRegistry,
    config: PipelineConfig,
}

impl PipelineExecutor {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        provider: Arc<dyn LlmProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            registry: StepRegistry::standard(),
            config,
        }
    }

    /// Replace the step implementations.
    pub fn with_registry(mut self, registry: StepRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage of a pending run in order.
    ///
    /// The first failing stage fails the run; the stages after it stay
    /// pending. Returns the outputs of all stages on success.
    pub async fn run_pipeline(&self, run_id: Uuid) -> Result<PriorOutputs, PipelineError> {
        self.run_pipeline_inner(run_id)
            .instrument(info_span!("pipeline_run", run_id = %run_id))
            .await
    }

    async fn run_pipeline_inner(&self, run_id: Uuid) -> Result<PriorOutputs, PipelineError> {
        let run = self.store.get_run(run_id)?;
        if run.status != RunStatus::Pending {
            return Err(PipelineError::InvalidState(format!(
                "run {} is {}, expected PENDING",
                run_id,
                run.status.as_str()
            )));
        }

        let missing = self.registry.missing_stages();
        if !missing.is_empty() {
            return Err(PipelineError::InvalidState(format!(
                "no step registered for {:?}",
                missing
            )));
        }

        let steps = self.store.get_steps_by_run(run_id)?;
        check_step_records(&steps)?;

        self.store.update_run(run_id, RunUpdate::running())?;
        tracing::info!(name = %run.name, "Run started");
        let start = Instant::now();

        let payload = InitialPayload::from_value(&run.initial_payload);
        let mut prior = PriorOutputs::new();

        for record in &steps {
            match self.run_step(record, &prior, &payload).await {
                Ok(output) => prior.insert(output),
                Err(e) => {
                    tracing::warn!(stage = %record.stage, error = %e, "Run failed");
                    self.mark_run_failed(run_id);
                    return Err(e);
                }
            }
        }

        if let Err(e) = self
            .store
            .update_run(run_id, RunUpdate::finished(RunStatus::Completed))
        {
            // Leave the run terminal so pollers stop waiting
            tracing::error!(error = %e, "Failed to record run completion");
            self.mark_run_failed(run_id);
            return Err(e.into());
        }
        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Run completed"
        );
        Ok(prior)
    }

    /// Execute one stage: mark it running, prompt, parse, validate, persist.
    ///
    /// On failure the step record is moved to failed (best effort) and the
    /// original error is returned.
    pub async fn run_step(
        &self,
        record: &StepRecord,
        prior: &PriorOutputs,
        payload: &InitialPayload,
    ) -> Result<StageOutput, PipelineError> {
        self.run_step_inner(record, prior, payload)
            .instrument(info_span!("pipeline_step", stage = %record.stage))
            .await
    }

    async fn run_step_inner(
        &self,
        record: &StepRecord,
        prior: &PriorOutputs,
        payload: &InitialPayload,
    ) -> Result<StageOutput, PipelineError> {
        let step = self.registry.get(record.stage).ok_or_else(|| {
            PipelineError::InvalidState(format!("no step registered for {}", record.stage))
        })?;

        self.store.update_step(record.id, StepUpdate::running())?;
        let start = Instant::now();

        match self.execute_step(step, record, prior, payload).await {
            Ok(output) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Stage completed"
                );
                Ok(output)
            }
            Err(e) => {
                self.mark_step_failed(record.id, &e);
                Err(e)
            }
        }
    }

    async fn execute_step(
        &self,
        step: &dyn StageStep,
        record: &StepRecord,
        prior: &PriorOutputs,
        payload: &InitialPayload,
    ) -> Result<StageOutput, PipelineError> {
        let stage = record.stage;
        let meta = step.metadata();

        let user = step.format_input(&StepContext {
            payload,
            outputs: prior,
        })?;
        let request = CompletionRequest {
            system: meta.system_instruction.to_string(),
            user,
            max_tokens: meta.max_tokens,
            temperature: meta.temperature,
        };
        let input = serde_json::to_value(&request).map_err(StoreError::Serialization)?;
        self.store
            .update_step(record.id, StepUpdate::with_input(input))?;

        let raw = self.complete_with_retry(stage, &request).await?;

        let candidate = step.parse_output(&raw);
        if let Some(reason) = sentinel_error(&candidate) {
            tracing::warn!(reason, "No JSON could be extracted from the response");
        }
        if !step.validate_output(&candidate) {
            tracing::warn!(response = %preview(&raw), "Response failed validation");
            return Err(PipelineError::ValidationFailed { stage });
        }

        let output = StageOutput::from_value(stage, &candidate).map_err(|e| {
            tracing::warn!(error = %e, "Validated output does not match the stage type");
            PipelineError::ValidationFailed { stage }
        })?;

        self.store
            .update_step(record.id, StepUpdate::completed(candidate))?;
        Ok(output)
    }

    /// Call the provider up to `max_attempts` times with a fixed delay between tries.
    async fn complete_with_retry(
        &self,
        stage: Stage,
        request: &CompletionRequest,
    ) -> Result<String, PipelineError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.provider.complete(request).await {
                Ok(text) => {
                    tracing::debug!(attempt, chars = text.len(), "Completion received");
                    return Ok(text);
                }
                Err(e) => {
                    tracing::warn!(attempt, max_attempts, error = %e, "Completion attempt failed");
                    if attempt >= max_attempts {
                        return Err(PipelineError::Completion {
                            stage,
                            attempts: attempt,
                            source: e,
                        });
                    }
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    fn mark_step_failed(&self, step_id: Uuid, error: &PipelineError) {
        if let Err(e) = self
            .store
            .update_step(step_id, StepUpdate::failed(error.to_string()))
        {
            tracing::error!(step_id = %step_id, error = %e, "Failed to record step failure");
        }
    }

    fn mark_run_failed(&self, run_id: Uuid) {
        if let Err(e) = self
            .store
            .update_run(run_id, RunUpdate::finished(RunStatus::Failed))
        {
            tracing::error!(error = %e, "Failed to record run failure");
        }
    }
}

/// The run must have exactly one pending record per stage, in stage order.
fn check_step_records(steps: &[StepRecord]) -> Result<(), PipelineError> {
    let stages: Vec<Stage> = steps.iter().map(|s| s.stage).collect();
    if stages != Stage::ALL {
        return Err(PipelineError::InvalidState(format!(
            "step records {:?} do not match the stage sequence",
            stages
        )));
    }
    if let Some(step) = steps.iter().find(|s| s.status != StepStatus::Pending) {
        return Err(PipelineError::InvalidState(format!(
            "step {} is {}, expected PENDING",
            step.stage,
            step.status.as_str()
        )));
    }
    Ok(())
}

/// Run a pipeline in the background.
///
/// The caller does not wait for completion; progress is observed by reading
/// the run and its step records from the store.
pub fn start_pipeline(executor: Arc<PipelineExecutor>, run_id: Uuid) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = executor.run_pipeline(run_id).await {
            tracing::warn!("Pipeline run {} failed: {}", run_id, e);
        }
    })
}
