//! Persistence layer: sqlx/Postgres models and repositories.
//!
//! The schema lives in `migrations/`. The job, profile, and template
//! tables are shared with the external API; the worker only ever mutates
//! them through single-statement conditional updates so concurrent API
//! writes (pause, cancel, resume) are never lost.

pub mod models;
pub mod repositories;

use sqlx::PgPool;

/// Embedded migrations, applied at worker startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Cheap connectivity check used at worker startup.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
