pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod outputs;
pub mod pipeline;
pub mod store;
pub mod types;

pub use config::{LlmConfig, PipelineConfig};
pub use error::{PipelineError, INVALID_OUTPUT_MESSAGE};
pub use extract::{extract_json, parse_or_sentinel, ExtractionStrategy};
pub use llm::{
    create_provider, create_provider_from_env, CachingProvider, ClaudeProvider,
    CompletionRequest, FakeProvider, GeminiProvider, LlmError, LlmProvider,
};
pub use outputs::{PriorOutputs, StageOutput};
pub use pipeline::{start_pipeline, PipelineExecutor, StageStep, StepRegistry};
pub use store::{InMemoryStore, RunUpdate, SqliteStore, StepUpdate, StoreError, WorkflowStore};
pub use types::{InitialPayload, Run, RunStatus, Stage, StepRecord, StepStatus};
