//! Repository for the `form_templates` table (the action cache).

use sqlx::PgPool;

use formflow_core::types::DbId;

use crate::models::template::FormTemplate;

const COLUMNS: &str = "id, url, name, actions, created_at, updated_at";

/// Provides lookup and upsert for cached action sequences, keyed by
/// exact URL string. No normalization beyond what the caller supplies.
pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn get_by_url(
        pool: &PgPool,
        url: &str,
    ) -> Result<Option<FormTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM form_templates WHERE url = $1");
        sqlx::query_as::<_, FormTemplate>(&query)
            .bind(url)
            .fetch_optional(pool)
            .await
    }

    /// Create or overwrite the template for a URL after a fully
    /// successful AI-driven first step.
    pub async fn upsert(
        pool: &PgPool,
        url: &str,
        actions: &serde_json::Value,
    ) -> Result<FormTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO form_templates (url, actions, updated_at) \
             VALUES ($1, $2, NOW()) \
             ON CONFLICT (url) DO UPDATE SET actions = $2, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FormTemplate>(&query)
            .bind(url)
            .bind(actions)
            .fetch_one(pool)
            .await
    }

    /// Operator surface: rename a cached template.
    pub async fn rename(
        pool: &PgPool,
        id: DbId,
        name: &str,
    ) -> Result<Option<FormTemplate>, sqlx::Error> {
        let query =
            format!("UPDATE form_templates SET name = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, FormTemplate>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Operator surface: drop a cached template.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM form_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
