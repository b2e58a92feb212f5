//! Repository for the `jobs` table.
//!
//! Uses the `JobStatus` enum from `models::status` for all status
//! transitions. Every mutation the worker performs is a single-statement
//! conditional update guarded by the expected prior status, so a pause or
//! cancel written concurrently by the external API is never clobbered.

use sqlx::PgPool;

use formflow_core::scheduling::PRIORITY_URGENT;
use formflow_core::types::DbId;

use crate::models::job::{CreateJob, Job};
use crate::models::status::{JobStatus, StatusId, STOP_STATUSES, TERMINAL_STATUSES};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, url, job_type, status_id, profile_id, custom_data, file_path, \
    form_name, retries, priority, created_at, started_at, completed_at";

/// Row-selection clause for claiming. Lower priority value = more urgent;
/// `FOR UPDATE SKIP LOCKED` keeps concurrent claimants from ever taking
/// the same row.
const CLAIM_SELECT: &str = "\
    SELECT id FROM jobs \
    WHERE status_id = $2 \
    ORDER BY priority ASC, created_at ASC \
    LIMIT $3 \
    FOR UPDATE SKIP LOCKED";

/// Provides CRUD and lifecycle operations for automation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new pending job. Normally done by the external API; kept
    /// here for tooling and tests.
    pub async fn create(pool: &PgPool, input: &CreateJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (url, job_type, status_id, profile_id, custom_data, file_path, form_name, priority) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(&input.url)
            .bind(input.job_type.as_deref().unwrap_or("FORM_SUBMISSION"))
            .bind(JobStatus::Pending.id())
            .bind(input.profile_id)
            .bind(
                input
                    .custom_data
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({})),
            )
            .bind(&input.file_path)
            .bind(&input.form_name)
            .bind(input.priority.unwrap_or(0))
            .fetch_one(pool)
            .await
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Current status only; the pause/cancel checkpoints poll this.
    pub async fn status(pool: &PgPool, id: DbId) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>("SELECT status_id FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim up to `limit` pending jobs for this worker.
    ///
    /// Claimed jobs are stamped Processing with `started_at = NOW()` in
    /// the same statement, ordered by (priority ASC, created_at ASC).
    pub async fn claim_pending(pool: &PgPool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $1, started_at = NOW() \
             WHERE id IN ({CLAIM_SELECT}) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Processing.id())
            .bind(JobStatus::Pending.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// True when a pending job carries the urgent priority sentinel (or
    /// better). Drives the exclusive-priority claim mode.
    pub async fn has_urgent_pending(pool: &PgPool) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE status_id = $1 AND priority <= $2",
        )
        .bind(JobStatus::Pending.id())
        .bind(PRIORITY_URGENT)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    /// Mark a job completed, unless a terminal status already won.
    pub async fn mark_completed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $2, completed_at = NOW() \
             WHERE id = $1 AND status_id <> ALL($3)",
        )
        .bind(id)
        .bind(JobStatus::Completed.id())
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Finalize a cancellation (from Cancelling or any other live state).
    pub async fn mark_cancelled(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status_id = $2, completed_at = NOW() \
             WHERE id = $1 AND status_id <> ALL($3)",
        )
        .bind(id)
        .bind(JobStatus::Cancelled.id())
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Retry budget exhausted: park the job permanently.
    pub async fn mark_dead(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status_id = $2, completed_at = NOW() \
             WHERE id = $1 AND status_id <> ALL($3)",
        )
        .bind(id)
        .bind(JobStatus::Dead.id())
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Put a failed job back in the queue with an incremented retry
    /// count. With `escalate`, priority is forced to the urgent sentinel
    /// so the retry is claimed next.
    pub async fn requeue_for_retry(
        pool: &PgPool,
        id: DbId,
        escalate: bool,
    ) -> Result<(), sqlx::Error> {
        if escalate {
            sqlx::query(
                "UPDATE jobs SET status_id = $2, retries = retries + 1, priority = $3 \
                 WHERE id = $1 AND status_id <> ALL($4)",
            )
            .bind(id)
            .bind(JobStatus::Pending.id())
            .bind(PRIORITY_URGENT)
            .bind(&TERMINAL_STATUSES[..])
            .execute(pool)
            .await?;
        } else {
            sqlx::query(
                "UPDATE jobs SET status_id = $2, retries = retries + 1 \
                 WHERE id = $1 AND status_id <> ALL($3)",
            )
            .bind(id)
            .bind(JobStatus::Pending.id())
            .bind(&TERMINAL_STATUSES[..])
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// Arm the human-in-the-loop mailbox: merge the pending question
    /// metadata into `custom_data` and flip to WaitingInput, in one
    /// statement conditioned on the job still being live. Returns false
    /// when the job was cancelled or finished concurrently; the caller
    /// must not wait in that case.
    pub async fn begin_waiting_input(
        pool: &PgPool,
        id: DbId,
        kind: &str,
        label: &str,
    ) -> Result<bool, sqlx::Error> {
        let meta = serde_json::json!({
            "_missing_type": kind,
            "_missing_label": label,
        });
        let mut blocked: Vec<StatusId> = TERMINAL_STATUSES.to_vec();
        blocked.push(JobStatus::Cancelling.id());
        let result = sqlx::query(
            "UPDATE jobs SET custom_data = custom_data || $2, status_id = $3 \
             WHERE id = $1 AND status_id <> ALL($4)",
        )
        .bind(id)
        .bind(meta)
        .bind(JobStatus::WaitingInput.id())
        .bind(&blocked[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Acknowledge a supplied answer: Resuming -> Processing.
    pub async fn resume_processing(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $2 WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(JobStatus::Processing.id())
        .bind(JobStatus::Resuming.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Status, file path, and custom_data in one read, for the ask-user
    /// wait loop.
    pub async fn input_snapshot(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<(StatusId, Option<String>, serde_json::Value)>, sqlx::Error> {
        sqlx::query_as::<_, (StatusId, Option<String>, serde_json::Value)>(
            "SELECT status_id, file_path, custom_data FROM jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Crash recovery: sweep jobs orphaned in Processing by an unclean
    /// shutdown to Failed. Returns the number of swept rows.
    pub async fn fail_stuck_jobs(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $1, completed_at = NOW() WHERE status_id = $2",
        )
        .bind(JobStatus::Failed.id())
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// True when the given status requires the executor to abort.
    pub fn is_stop_status(status: StatusId) -> bool {
        STOP_STATUSES.contains(&status)
    }
}
