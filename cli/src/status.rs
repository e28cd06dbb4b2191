//! `copyforge status` and `copyforge runs`.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, Utc};
use copyforge_core::{Stage, WorkflowStore};
use serde_json::json;
use uuid::Uuid;

fn local_time(t: &DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn show_status(
    store: &dyn WorkflowStore,
    run_id: Uuid,
    stage: Option<Stage>,
    as_json: bool,
) -> Result<()> {
    let run = store.get_run(run_id)?;
    let steps = store.get_steps_by_run(run_id)?;

    if let Some(stage) = stage {
        let step = steps
            .iter()
            .find(|s| s.stage == stage)
            .ok_or_else(|| anyhow!("Run {} has no {} step", run_id, stage))?;
        let output = step
            .output
            .as_ref()
            .ok_or_else(|| anyhow!("{} has no output (status {})", stage, step.status.as_str()))?;
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }

    if as_json {
        let document = json!({ "run": run, "steps": steps });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("Run:     {} ({})", run.id, run.name);
    println!("Status:  {}", run.status.as_str());
    println!("Created: {}", local_time(&run.created_at));
    if let Some(done) = &run.completed_at {
        println!("Done:    {}", local_time(done));
    }
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("{:>2}. {:<22} {}", i + 1, step.stage, step.status.as_str());
        if let Some(error) = &step.error {
            println!("    error: {}", error);
        }
    }
    Ok(())
}

pub fn list_runs(store: &dyn WorkflowStore) -> Result<()> {
    let runs = store.list_runs()?;
    if runs.is_empty() {
        println!("No runs yet");
        return Ok(());
    }
    for run in runs {
        println!(
            "{}  {:<9}  {}  {}",
            run.id,
            run.status.as_str(),
            local_time(&run.created_at),
            run.name
        );
    }
    Ok(())
}
