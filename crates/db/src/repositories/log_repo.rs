//! Repository for the append-only `job_logs` table.

use sqlx::PgPool;

use formflow_core::types::DbId;

/// Append-only writer for the per-job structured log trail.
pub struct LogRepo;

impl LogRepo {
    pub async fn append(
        pool: &PgPool,
        job_id: DbId,
        severity: &str,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO job_logs (job_id, severity, message, metadata) VALUES ($1, $2, $3, $4)",
        )
        .bind(job_id)
        .bind(severity)
        .bind(message)
        .bind(metadata)
        .execute(pool)
        .await?;
        Ok(())
    }
}
