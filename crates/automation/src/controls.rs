//! Contracts between the engine and its host: job controls, logging,
//! and the per-job profile data.

use std::collections::BTreeMap;

use async_trait::async_trait;

use formflow_core::types::DbId;

use crate::error::AutomationError;

/// Sentinel answer meaning "leave this field unfilled and move on".
pub const SKIP_SENTINEL: &str = "skip";

/// What kind of input is being requested from the human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskKind {
    Text,
    File,
}

impl AskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::File => "file",
        }
    }
}

/// Lifecycle controls supplied by the worker to an executing job.
#[async_trait]
pub trait JobControls: Send + Sync {
    /// Checkpoint: returns immediately while the job is live, blocks
    /// while it is paused, and errors when it must abort.
    async fn check_pause(&self) -> Result<(), AutomationError>;

    /// Block until a human supplies a value (bounded wait). `None`
    /// means cancelled or timed out — fatal to the current attempt.
    async fn ask_user(&self, kind: AskKind, label: &str)
        -> Result<Option<String>, AutomationError>;

    /// Persist a learned key/value to the job's profile. Best effort;
    /// implementations log failures instead of raising.
    async fn save_learned_data(&self, key: &str, value: &str);
}

/// Job-scoped structured log sink (append-only trail plus tracing).
#[async_trait]
pub trait AutomationLogger: Send + Sync {
    async fn log(&self, severity: &str, message: &str, metadata: Option<serde_json::Value>);
}

/// The merged mapping consumed by the plan generator and the fuzzy
/// matcher: profile payload ∪ job custom_data ∪ uploaded file ∪ date
/// context. Rebuilt once per job invocation; never persisted itself.
#[derive(Debug, Clone, Default)]
pub struct ProfileData {
    values: BTreeMap<String, String>,
    job_id: Option<DbId>,
    profile_id: Option<DbId>,
}

impl ProfileData {
    pub fn new(job_id: Option<DbId>, profile_id: Option<DbId>) -> Self {
        Self {
            values: BTreeMap::new(),
            job_id,
            profile_id,
        }
    }

    pub fn job_id(&self) -> Option<DbId> {
        self.job_id
    }

    /// A profile must be attached for learned-data writes to happen.
    pub fn has_profile(&self) -> bool {
        self.profile_id.is_some()
    }

    pub fn profile_id(&self) -> Option<DbId> {
        self.profile_id
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Merge `other` over the current values (later sources win).
    pub fn merge(&mut self, other: BTreeMap<String, String>) {
        self.values.extend(other);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// True when `value` is already stored under any key; used to avoid
    /// duplicating a learned-data write for a profile-sourced answer.
    pub fn contains_value(&self, value: &str) -> bool {
        self.values.values().any(|v| v == value)
    }

    pub fn uploaded_file_path(&self) -> Option<&str> {
        self.get("uploaded_file_path")
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// JSON object rendering for prompt embedding.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}
