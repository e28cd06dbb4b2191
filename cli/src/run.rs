//! `copyforge run`: create a run, start it and poll until it finishes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use copyforge_core::{
    create_provider, start_pipeline, LlmConfig, LlmProvider, PipelineConfig, PipelineExecutor,
    RunStatus, Stage, StepStatus, WorkflowStore,
};
use serde_json::{Map, Value as JsonValue};

pub struct RunOptions {
    pub name: String,
    pub payload: JsonValue,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub cache_dir: Option<PathBuf>,
    pub poll_interval_ms: u64,
}

/// Merge `--payload` JSON with the individual flags; flags win.
pub fn build_payload(
    payload: Option<&str>,
    genre: Option<String>,
    keywords: Vec<String>,
    audience: Option<String>,
) -> Result<JsonValue> {
    let mut object = match payload {
        Some(raw) => {
            let parsed: JsonValue =
                serde_json::from_str(raw).context("--payload is not valid JSON")?;
            match parsed {
                JsonValue::Object(map) => map,
                other => bail!("--payload must be a JSON object, got {}", other),
            }
        }
        None => Map::new(),
    };

    if let Some(genre) = genre {
        object.insert("targetGenre".to_string(), JsonValue::String(genre));
    }
    if !keywords.is_empty() {
        object.insert(
            "keywords".to_string(),
            JsonValue::Array(keywords.into_iter().map(JsonValue::String).collect()),
        );
    }
    if let Some(audience) = audience {
        object.insert("targetAudience".to_string(), JsonValue::String(audience));
    }

    Ok(JsonValue::Object(object))
}

fn llm_config(options: &RunOptions) -> LlmConfig {
    let mut config = LlmConfig::from_env();
    if let Some(provider) = &options.provider {
        config.provider = provider.clone();
    }
    if options.model.is_some() {
        config.model = options.model.clone();
    }
    if options.cache_dir.is_some() {
        config.cache_dir = options.cache_dir.clone();
    }
    config
}

fn pipeline_config(options: &RunOptions) -> PipelineConfig {
    let defaults = PipelineConfig::from_env();
    PipelineConfig::new(
        options.max_attempts.unwrap_or(defaults.max_attempts),
        options
            .retry_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay),
    )
}

pub async fn run(store: Arc<dyn WorkflowStore>, options: RunOptions) -> Result<()> {
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&llm_config(&options))?);
    println!(
        "Using {} ({})",
        provider.provider_name(),
        provider.model_name()
    );

    let run = store.create_run(&options.name, options.payload.clone())?;
    println!("Created run {} ({})", run.id, run.name);

    let executor = Arc::new(PipelineExecutor::new(
        store.clone(),
        provider,
        pipeline_config(&options),
    ));
    let handle = start_pipeline(executor, run.id);

    let interval = Duration::from_millis(options.poll_interval_ms.max(10));
    let mut seen: HashMap<Stage, StepStatus> = HashMap::new();
    loop {
        let finished = handle.is_finished();
        for step in store.get_steps_by_run(run.id)? {
            if seen.get(&step.stage) != Some(&step.status) {
                seen.insert(step.stage, step.status);
                if step.status != StepStatus::Pending {
                    println!("  {:<22} {}", step.stage, step.status.as_str());
                }
            }
        }

        let current = store.get_run(run.id)?;
        if current.status.is_terminal() || finished {
            break;
        }
        tokio::time::sleep(interval).await;
    }
    handle.await.context("pipeline task panicked")?;

    let run = store.get_run(run.id)?;
    match run.status {
        RunStatus::Completed => {
            println!("Run {} completed", run.id);
            Ok(())
        }
        RunStatus::Failed => {
            let steps = store.get_steps_by_run(run.id)?;
            let failed = steps.iter().find(|s| s.status == StepStatus::Failed);
            match failed {
                Some(step) => Err(anyhow!(
                    "Run {} failed at {}: {}",
                    run.id,
                    step.stage,
                    step.error.as_deref().unwrap_or("unknown error")
                )),
                None => Err(anyhow!("Run {} failed", run.id)),
            }
        }
        other => Err(anyhow!(
            "Run {} stopped in state {}",
            run.id,
            other.as_str()
        )),
    }
}
