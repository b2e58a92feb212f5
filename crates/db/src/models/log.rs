//! Job log entity model.

use serde::Serialize;
use sqlx::FromRow;

use formflow_core::types::{DbId, Timestamp};

/// A row from the append-only `job_logs` table. The structured log trail
/// is the sole user-visible failure-reporting channel besides the job
/// status itself.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobLog {
    pub id: DbId,
    pub job_id: DbId,
    /// info | warning | error | action | success
    pub severity: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
}
