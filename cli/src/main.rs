mod run;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use copyforge_core::{InMemoryStore, SqliteStore, Stage, WorkflowStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "copyforge")]
#[command(about = "Run the marketing content pipeline", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "DATABASE_URL", default_value = "copyforge.db", global = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fixed stage sequence
    Stages,
    /// Create a run, execute it and follow its progress
    Run {
        /// Display name for the run
        #[arg(long, default_value = "copyforge run")]
        name: String,
        /// Target genre (e.g. "health")
        #[arg(long)]
        genre: Option<String>,
        /// Keyword to research; repeat for several
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// Target audience description
        #[arg(long)]
        audience: Option<String>,
        /// Full initial payload as JSON; merged under the flags above
        #[arg(long)]
        payload: Option<String>,
        /// LLM provider: fake, claude or gemini
        #[arg(long)]
        provider: Option<String>,
        /// Model name override
        #[arg(long)]
        model: Option<String>,
        /// Completion attempts per stage
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Fixed delay between attempts in milliseconds
        #[arg(long)]
        retry_delay_ms: Option<u64>,
        /// Cache completions on disk under this directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Keep state in memory instead of the database
        #[arg(long)]
        in_memory: bool,
        /// How often to poll step state, in milliseconds
        #[arg(long, default_value = "250")]
        poll_interval_ms: u64,
    },
    /// Show a run and its steps
    Status {
        run_id: Uuid,
        /// Print the stored output of one stage as JSON
        #[arg(long, value_parser = parse_stage)]
        stage: Option<Stage>,
        /// Print the run and steps as JSON
        #[arg(long)]
        json: bool,
    },
    /// List runs, newest first
    Runs,
}

fn parse_stage(s: &str) -> Result<Stage, String> {
    let normalized = s.trim().to_uppercase().replace('-', "_");
    Stage::from_str(&normalized).ok_or_else(|| {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown stage '{}', expected one of {}", s, names.join(", "))
    })
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("copyforge_core=info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn open_store(database_url: &str) -> Result<Arc<dyn WorkflowStore>> {
    Ok(Arc::new(SqliteStore::open(database_url)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stages => {
            for (i, stage) in Stage::ALL.iter().enumerate() {
                println!("{}. {}", i + 1, stage);
            }
        }
        Commands::Run {
            name,
            genre,
            keywords,
            audience,
            payload,
            provider,
            model,
            max_attempts,
            retry_delay_ms,
            cache_dir,
            in_memory,
            poll_interval_ms,
        } => {
            let store: Arc<dyn WorkflowStore> = if in_memory {
                Arc::new(InMemoryStore::new())
            } else {
                open_store(&cli.database_url)?
            };
            let options = run::RunOptions {
                name,
                payload: run::build_payload(payload.as_deref(), genre, keywords, audience)?,
                provider,
                model,
                max_attempts,
                retry_delay_ms,
                cache_dir,
                poll_interval_ms,
            };
            run::run(store, options).await?;
        }
        Commands::Status {
            run_id,
            stage,
            json,
        } => {
            let store = open_store(&cli.database_url)?;
            status::show_status(store.as_ref(), run_id, stage, json)?;
        }
        Commands::Runs => {
            let store = open_store(&cli.database_url)?;
            status::list_runs(store.as_ref())?;
        }
    }

    Ok(())
}
