use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::StoreError;
use crate::types::{Run, RunStatus, Stage, StepRecord, StepStatus};

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = super::schema::workflow_runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct RunRow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub initial_payload: String,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = super::schema::workflow_steps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct StepRow {
    pub id: String,
    pub run_id: String,
    pub stage: String,
    pub position: i32,
    pub status: String,
    pub input: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

fn parse_uuid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|e| StoreError::Database(format!("bad id {}: {}", value, e)))
}

fn parse_json(value: Option<&str>) -> Result<Option<JsonValue>, StoreError> {
    value
        .map(serde_json::from_str::<JsonValue>)
        .transpose()
        .map_err(StoreError::Serialization)
}

fn to_json_text(value: Option<&JsonValue>) -> Result<Option<String>, StoreError> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::Serialization)
}

impl RunRow {
    pub fn from_run(run: &Run) -> Result<Self, StoreError> {
        Ok(Self {
            id: run.id.to_string(),
            name: run.name.clone(),
            status: run.status.as_str().to_string(),
            initial_payload: serde_json::to_string(&run.initial_payload)?,
            created_at: run.created_at.naive_utc(),
            completed_at: run.completed_at.map(|t| t.naive_utc()),
        })
    }

    pub fn into_run(self) -> Result<Run, StoreError> {
        let status = RunStatus::from_str(&self.status)
            .ok_or_else(|| StoreError::Database(format!("unknown run status {}", self.status)))?;
        Ok(Run {
            id: parse_uuid(&self.id)?,
            name: self.name,
            status,
            initial_payload: serde_json::from_str(&self.initial_payload)?,
            created_at: Utc.from_utc_datetime(&self.created_at),
            completed_at: self.completed_at.map(|t| Utc.from_utc_datetime(&t)),
        })
    }
}

impl StepRow {
    pub fn from_step(step: &StepRecord) -> Result<Self, StoreError> {
        Ok(Self {
            id: step.id.to_string(),
            run_id: step.run_id.to_string(),
            stage: step.stage.as_str().to_string(),
            position: step.stage.position() as i32,
            status: step.status.as_str().to_string(),
            input: to_json_text(step.input.as_ref())?,
            output: to_json_text(step.output.as_ref())?,
            error: step.error.clone(),
            created_at: step.created_at.naive_utc(),
            completed_at: step.completed_at.map(|t| t.naive_utc()),
        })
    }

    pub fn into_step(self) -> Result<StepRecord, StoreError> {
        let stage = Stage::from_str(&self.stage)
            .ok_or_else(|| StoreError::Database(format!("unknown stage {}", self.stage)))?;
        let status = StepStatus::from_str(&self.status)
            .ok_or_else(|| StoreError::Database(format!("unknown step status {}", self.status)))?;
        Ok(StepRecord {
            id: parse_uuid(&self.id)?,
            run_id: parse_uuid(&self.run_id)?,
            stage,
            status,
            input: parse_json(self.input.as_deref())?,
            output: parse_json(self.output.as_deref())?,
            error: self.error,
            created_at: Utc.from_utc_datetime(&self.created_at),
            completed_at: self.completed_at.map(|t| Utc.from_utc_datetime(&t)),
        })
    }
}
