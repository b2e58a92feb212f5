//! Error taxonomy for the automation engine.
//!
//! Failures are recovered as locally as possible (one skipped action,
//! one retried navigation) before bubbling; only the variants here ever
//! cross the executor/orchestrator boundary, and the worker translates
//! each into a job status transition plus a log entry.

use formflow_browser::BrowserError;
use formflow_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    /// The human cancelled (or timed out on) a blocking input request.
    /// Fatal to the current job attempt.
    #[error("User cancelled input")]
    UserCancelled,

    /// A stop status (cancelled/cancelling/dead) was observed at a
    /// checkpoint.
    #[error("Job stopped by user (status: {status})")]
    JobStopped { status: i16 },

    /// The step loop hit its hard cap without resolving the form.
    #[error("Form did not resolve within {steps} steps")]
    StepLimit { steps: u32 },

    /// Navigation failed after bounded retries.
    #[error("Navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// True when the failure expresses user cancel intent; the worker
    /// maps these to CANCELLED instead of the retry path.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::UserCancelled | Self::JobStopped { .. })
    }
}
