//! SQLite workflow store (diesel + r2d2).

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::models::{RunRow, StepRow};
use super::schema::{workflow_runs, workflow_steps};
use super::{
    apply_run_update, apply_step_update, new_run_records, RunUpdate, StepUpdate, StoreError,
    WorkflowStore,
};
use crate::types::{Run, StepRecord};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => StoreError::NotFound("record".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Applied to every pooled connection.
#[derive(Debug)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(r2d2::Error::QueryError)
    }
}

/// Durable store backed by a SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (or create) the database at `database_url` and run pending migrations.
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .connection_customizer(Box::new(ConnectionPragmas))
            .build(manager)
            .map_err(|e| StoreError::Database(format!("failed to create pool: {}", e)))?;

        let mut conn = pool
            .get()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Database(format!("failed to run migrations: {}", e)))?;

        tracing::debug!(database_url, "Opened SQLite workflow store");
        Ok(Self { pool })
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<ConnectionManager<SqliteConnection>>, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl WorkflowStore for SqliteStore {
    fn create_run(&self, name: &str, initial_payload: JsonValue) -> Result<Run, StoreError> {
        let (run, steps) = new_run_records(name, initial_payload);
        let run_row = RunRow::from_run(&run)?;
        let step_rows = steps
            .iter()
            .map(StepRow::from_step)
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            diesel::insert_into(workflow_runs::table)
                .values(&run_row)
                .execute(conn)?;
            diesel::insert_into(workflow_steps::table)
                .values(&step_rows)
                .execute(conn)?;
            Ok(())
        })?;

        Ok(run)
    }

    fn get_run(&self, run_id: Uuid) -> Result<Run, StoreError> {
        let mut conn = self.conn()?;
        workflow_runs::table
            .find(run_id.to_string())
            .select(RunRow::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("run {}", run_id)))?
            .into_run()
    }

    fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut conn = self.conn()?;
        workflow_runs::table
            .order(workflow_runs::created_at.desc())
            .select(RunRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(RunRow::into_run)
            .collect()
    }

    fn update_run(&self, run_id: Uuid, update: RunUpdate) -> Result<Run, StoreError> {
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, StoreError, _>(|conn| {
            let mut run = workflow_runs::table
                .find(run_id.to_string())
                .select(RunRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("run {}", run_id)))?
                .into_run()?;
            apply_run_update(&mut run, update)?;

            diesel::update(workflow_runs::table.find(run_id.to_string()))
                .set(&RunRow::from_run(&run)?)
                .execute(conn)?;
            Ok(run)
        })
    }

    fn update_step(&self, step_id: Uuid, update: StepUpdate) -> Result<StepRecord, StoreError> {
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, StoreError, _>(|conn| {
            let mut step = workflow_steps::table
                .find(step_id.to_string())
                .select(StepRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("step {}", step_id)))?
                .into_step()?;
            apply_step_update(&mut step, update)?;

            diesel::update(workflow_steps::table.find(step_id.to_string()))
                .set(&StepRow::from_step(&step)?)
                .execute(conn)?;
            Ok(step)
        })
    }

    fn get_steps_by_run(&self, run_id: Uuid) -> Result<Vec<StepRecord>, StoreError> {
        let mut conn = self.conn()?;
        let rows = workflow_steps::table
            .filter(workflow_steps::run_id.eq(run_id.to_string()))
            .order(workflow_steps::position.asc())
            .select(StepRow::as_select())
            .load(&mut conn)?;

        if rows.is_empty() {
            // Distinguish "no such run" from a run without steps
            self.get_run(run_id)?;
        }
        rows.into_iter().map(StepRow::into_step).collect()
    }
}
