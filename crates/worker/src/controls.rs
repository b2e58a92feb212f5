//! Database-backed job controls and logging.
//!
//! Pause, cancel, and human input all travel through the job row: the
//! external API writes statuses and answer keys, the worker polls them
//! at its checkpoints. No channel between the two processes exists.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use formflow_automation::controls::{AskKind, AutomationLogger, JobControls};
use formflow_automation::AutomationError;
use formflow_core::types::DbId;
use formflow_db::models::status::JobStatus;
use formflow_db::repositories::job_repo::JobRepo;
use formflow_db::repositories::log_repo::LogRepo;
use formflow_db::repositories::profile_repo::ProfileRepo;

const PAUSE_POLL: Duration = Duration::from_secs(2);
const ASK_POLL: Duration = Duration::from_secs(3);
const ASK_TIMEOUT: Duration = Duration::from_secs(600);

pub struct DbJobControls {
    pool: PgPool,
    job_id: DbId,
    profile_id: Option<DbId>,
}

impl DbJobControls {
    pub fn new(pool: PgPool, job_id: DbId, profile_id: Option<DbId>) -> Self {
        Self {
            pool,
            job_id,
            profile_id,
        }
    }

    async fn current_status(&self) -> Result<i16, AutomationError> {
        JobRepo::status(&self.pool, self.job_id)
            .await?
            .ok_or_else(|| {
                AutomationError::Internal(format!("Job {} row vanished", self.job_id))
            })
    }
}

#[async_trait]
impl JobControls for DbJobControls {
    async fn check_pause(&self) -> Result<(), AutomationError> {
        loop {
            let status = self.current_status().await?;
            if JobRepo::is_stop_status(status) {
                return Err(AutomationError::JobStopped { status });
            }
            if status != JobStatus::Paused.id() {
                return Ok(());
            }
            tracing::debug!(job_id = self.job_id, "Job paused, waiting");
            tokio::time::sleep(PAUSE_POLL).await;
        }
    }

    async fn ask_user(
        &self,
        kind: AskKind,
        label: &str,
    ) -> Result<Option<String>, AutomationError> {
        if !JobRepo::begin_waiting_input(&self.pool, self.job_id, kind.as_str(), label).await? {
            // The job was cancelled or finished while we were about to ask.
            return Ok(None);
        }
        tracing::info!(job_id = self.job_id, label, kind = kind.as_str(), "Waiting for user input");

        let deadline = tokio::time::Instant::now() + ASK_TIMEOUT;
        loop {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(job_id = self.job_id, label, "User input timed out");
                return Ok(None);
            }
            tokio::time::sleep(ASK_POLL).await;

            let Some((status, file_path, custom_data)) =
                JobRepo::input_snapshot(&self.pool, self.job_id).await?
            else {
                return Ok(None);
            };
            if JobRepo::is_stop_status(status) {
                return Ok(None);
            }
            if status != JobStatus::Resuming.id() {
                continue;
            }

            let answer = extract_answer(kind, label, file_path.as_deref(), &custom_data);
            if let Some(answer) = answer {
                JobRepo::resume_processing(&self.pool, self.job_id).await?;
                return Ok(Some(answer));
            }
            // Resuming without an answer yet; keep polling.
        }
    }

    async fn save_learned_data(&self, key: &str, value: &str) {
        let Some(profile_id) = self.profile_id else {
            return;
        };
        if let Err(e) =
            ProfileRepo::merge_learned_value(&self.pool, profile_id, key, value).await
        {
            tracing::warn!(
                job_id = self.job_id,
                profile_id,
                key,
                error = %e,
                "Failed to persist learned data",
            );
        }
    }
}

/// Answer preference: for file requests the job's file path wins; then
/// a custom_data key named after the question; then the generic
/// `user_response` key.
fn extract_answer(
    kind: AskKind,
    label: &str,
    file_path: Option<&str>,
    custom_data: &serde_json::Value,
) -> Option<String> {
    if kind == AskKind::File {
        if let Some(path) = file_path.filter(|p| !p.trim().is_empty()) {
            return Some(path.to_string());
        }
    }
    let by_label = custom_data.get(label).and_then(|v| v.as_str());
    if let Some(answer) = by_label.filter(|a| !a.trim().is_empty()) {
        return Some(answer.to_string());
    }
    custom_data
        .get("user_response")
        .and_then(|v| v.as_str())
        .filter(|a| !a.trim().is_empty())
        .map(str::to_string)
}

/// Structured log trail: tracing event plus a best-effort `job_logs` row.
pub struct DbAutomationLogger {
    pool: PgPool,
    job_id: DbId,
}

impl DbAutomationLogger {
    pub fn new(pool: PgPool, job_id: DbId) -> Self {
        Self { pool, job_id }
    }
}

#[async_trait]
impl AutomationLogger for DbAutomationLogger {
    async fn log(&self, severity: &str, message: &str, metadata: Option<serde_json::Value>) {
        match severity {
            "error" => tracing::error!(job_id = self.job_id, "{message}"),
            "warning" => tracing::warn!(job_id = self.job_id, "{message}"),
            _ => tracing::info!(job_id = self.job_id, "{message}"),
        }
        if let Err(e) =
            LogRepo::append(&self.pool, self.job_id, severity, message, metadata.as_ref()).await
        {
            tracing::warn!(job_id = self.job_id, error = %e, "Failed to append job log");
        }
    }
}
