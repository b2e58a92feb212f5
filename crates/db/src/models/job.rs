//! Job entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use formflow_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `jobs` table.
///
/// `custom_data` doubles as extra fill-context for the plan generator
/// and as the human-in-the-loop mailbox (`_missing_type` /
/// `_missing_label` question metadata, answer keys written by the API).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub url: String,
    pub job_type: String,
    pub status_id: StatusId,
    pub profile_id: Option<DbId>,
    pub custom_data: serde_json::Value,
    /// Uploaded file path(s); a single path or a JSON string array.
    pub file_path: Option<String>,
    pub form_name: Option<String>,
    pub retries: i32,
    /// Lower value = claimed sooner; -1 is the urgent sentinel.
    pub priority: i32,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// DTO for inserting a new job (normally done by the external API; the
/// worker only needs it in tooling and tests).
#[derive(Debug, Deserialize)]
pub struct CreateJob {
    pub url: String,
    pub job_type: Option<String>,
    pub profile_id: Option<DbId>,
    pub custom_data: Option<serde_json::Value>,
    pub file_path: Option<String>,
    pub form_name: Option<String>,
    pub priority: Option<i32>,
}
