use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    MarketResearch,
    ContentScraping,
    NlpClassification,
    TemplateOptimization,
    BusinessStrategy,
    ContentCreation,
    CopyGeneration,
    OptimizationArchive,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: &'static [Stage] = &[
        Stage::MarketResearch,
        Stage::ContentScraping,
        Stage::NlpClassification,
        Stage::TemplateOptimization,
        Stage::BusinessStrategy,
        Stage::ContentCreation,
        Stage::CopyGeneration,
        Stage::OptimizationArchive,
    ];

    /// Zero-based position of this stage in the sequence.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::ALL.len())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::MarketResearch => "MARKET_RESEARCH",
            Stage::ContentScraping => "CONTENT_SCRAPING",
            Stage::NlpClassification => "NLP_CLASSIFICATION",
            Stage::TemplateOptimization => "TEMPLATE_OPTIMIZATION",
            Stage::BusinessStrategy => "BUSINESS_STRATEGY",
            Stage::ContentCreation => "CONTENT_CREATION",
            Stage::CopyGeneration => "COPY_GENERATION",
            Stage::OptimizationArchive => "OPTIMIZATION_ARCHIVE",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MARKET_RESEARCH" => Some(Stage::MarketResearch),
            "CONTENT_SCRAPING" => Some(Stage::ContentScraping),
            "NLP_CLASSIFICATION" => Some(Stage::NlpClassification),
            "TEMPLATE_OPTIMIZATION" => Some(Stage::TemplateOptimization),
            "BUSINESS_STRATEGY" => Some(Stage::BusinessStrategy),
            "CONTENT_CREATION" => Some(Stage::ContentCreation),
            "COPY_GENERATION" => Some(Stage::CopyGeneration),
            "OPTIMIZATION_ARCHIVE" => Some(Stage::OptimizationArchive),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Lifecycle of a run.
///
/// Transitions only move forward: pending -> running -> completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RunStatus::Pending),
            "RUNNING" => Some(RunStatus::Running),
            "COMPLETED" => Some(RunStatus::Completed),
            "FAILED" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Whether a run may move from `self` to `next`.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

/// Lifecycle of a single step record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "PENDING",
            StepStatus::Running => "RUNNING",
            StepStatus::Completed => "COMPLETED",
            StepStatus::Failed => "FAILED",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(StepStatus::Pending),
            "RUNNING" => Some(StepStatus::Running),
            "COMPLETED" => Some(StepStatus::Completed),
            "FAILED" => Some(StepStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Whether a step may move from `self` to `next`.
    ///
    /// Running -> Running is allowed so the rendered prompt can be attached
    /// after the step has been marked as started.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Running, StepStatus::Running)
                | (StepStatus::Running, StepStatus::Completed)
                | (StepStatus::Running, StepStatus::Failed)
        )
    }
}

/// One end-to-end execution of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub name: String,
    pub status: RunStatus,
    pub initial_payload: JsonValue,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Persisted state of one stage within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub stage: Stage,
    pub status: StepStatus,
    pub input: Option<JsonValue>,
    pub output: Option<JsonValue>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The caller-supplied payload a run starts from.
///
/// Stored opaquely on the run; this is the view the first stage reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPayload {
    #[serde(default)]
    pub target_genre: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    /// Any other fields the caller sent along.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl InitialPayload {
    /// Read the typed view out of a run's stored payload.
    ///
    /// Each known field is read on its own: a mistyped field is dropped with a
    /// warning and the rest of the payload still reaches the prompts. A single
    /// keyword string is accepted and split on commas.
    pub fn from_value(value: &JsonValue) -> Self {
        let Some(object) = value.as_object() else {
            if !value.is_null() {
                tracing::warn!(kind = json_kind(value), "Initial payload is not an object, using defaults");
            }
            return Self::default();
        };

        let mut extra = object.clone();
        let target_genre = take_text(&mut extra, "targetGenre");
        let keywords = take_keywords(&mut extra);
        let target_audience = take_text(&mut extra, "targetAudience");

        Self {
            target_genre,
            keywords,
            target_audience,
            extra,
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn take_text(object: &mut serde_json::Map<String, JsonValue>, key: &str) -> Option<String> {
    match object.remove(key)? {
        JsonValue::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        JsonValue::String(_) | JsonValue::Null => None,
        other => {
            tracing::warn!(field = key, kind = json_kind(&other), "Ignoring mistyped payload field");
            None
        }
    }
}

fn take_keywords(object: &mut serde_json::Map<String, JsonValue>) -> Vec<String> {
    let split = |text: &str| -> Vec<String> {
        text.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    };

    match object.remove("keywords") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::String(text)) => split(&text),
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                JsonValue::String(text) => Some(text.trim().to_string()),
                other => {
                    tracing::warn!(kind = json_kind(other), "Ignoring non-string keyword");
                    None
                }
            })
            .filter(|k| !k.is_empty())
            .collect(),
        Some(other) => {
            tracing::warn!(field = "keywords", kind = json_kind(&other), "Ignoring mistyped payload field");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_str(stage.as_str()), Some(*stage));
            let serialized = serde_json::to_value(stage).unwrap();
            assert_eq!(serialized, json!(stage.as_str()));
        }
        assert_eq!(Stage::from_str("market_research"), None);
    }

    #[test]
    fn stage_positions_follow_declaration_order() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.position(), i);
        }
        assert_eq!(Stage::ALL.len(), 8);
    }

    #[test]
    fn run_status_never_regresses() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Completed));
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Failed.can_transition_to(RunStatus::Pending));
    }

    #[test]
    fn terminal_steps_are_frozen() {
        for next in [
            StepStatus::Pending,
            StepStatus::Running,
            StepStatus::Completed,
            StepStatus::Failed,
        ] {
            assert!(!StepStatus::Completed.can_transition_to(next));
            assert!(!StepStatus::Failed.can_transition_to(next));
        }
        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Failed));
    }

    #[test]
    fn initial_payload_reads_camel_case_and_keeps_extras() {
        let payload = InitialPayload::from_value(&json!({
            "targetGenre": "health",
            "keywords": ["fitness"],
            "budget": 500
        }));
        assert_eq!(payload.target_genre.as_deref(), Some("health"));
        assert_eq!(payload.keywords, vec!["fitness".to_string()]);
        assert_eq!(payload.extra.get("budget"), Some(&json!(500)));
    }

    #[test]
    fn initial_payload_tolerates_non_objects() {
        assert_eq!(InitialPayload::from_value(&json!(null)), InitialPayload::default());
        assert_eq!(InitialPayload::from_value(&json!([1, 2])), InitialPayload::default());
    }

    #[test]
    fn mistyped_field_keeps_the_rest_of_the_payload() {
        let payload = InitialPayload::from_value(&json!({
            "targetGenre": "health",
            "keywords": 42,
            "targetAudience": ["not", "text"],
            "budget": 500
        }));
        assert_eq!(payload.target_genre.as_deref(), Some("health"));
        assert!(payload.keywords.is_empty());
        assert_eq!(payload.target_audience, None);
        assert_eq!(payload.extra.get("budget"), Some(&json!(500)));
        assert!(!payload.extra.contains_key("keywords"));
    }

    #[test]
    fn keyword_string_is_split_on_commas() {
        let payload = InitialPayload::from_value(&json!({
            "targetGenre": "health",
            "keywords": "fitness, sleep,,"
        }));
        assert_eq!(payload.target_genre.as_deref(), Some("health"));
        assert_eq!(payload.keywords, vec!["fitness".to_string(), "sleep".to_string()]);

        let mixed = InitialPayload::from_value(&json!({ "keywords": ["energy", 3, " "] }));
        assert_eq!(mixed.keywords, vec!["energy".to_string()]);
    }
}
