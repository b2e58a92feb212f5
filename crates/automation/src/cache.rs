//! Template cache seam.
//!
//! A template is the recorded action sequence of a fully successful
//! AI-planned first step, keyed by exact job URL. Replaying it skips
//! the plan generator entirely; any replay failure falls back to a
//! fresh AI plan for the same step.

use async_trait::async_trait;
use sqlx::PgPool;

use formflow_core::action::Action;
use formflow_db::repositories::template_repo::TemplateRepo;

#[async_trait]
pub trait TemplateCache: Send + Sync {
    /// Cached actions for `url`, or `None` on miss. Entries that fail
    /// to deserialize are treated as misses.
    async fn lookup(&self, url: &str) -> Result<Option<Vec<Action>>, sqlx::Error>;

    /// Record `actions` as the template for `url`, overwriting any
    /// previous entry.
    async fn store(&self, url: &str, actions: &[Action]) -> Result<(), sqlx::Error>;
}

/// Postgres-backed cache over the `form_templates` table.
pub struct PgTemplateCache {
    pool: PgPool,
}

impl PgTemplateCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateCache for PgTemplateCache {
    async fn lookup(&self, url: &str) -> Result<Option<Vec<Action>>, sqlx::Error> {
        let Some(template) = TemplateRepo::get_by_url(&self.pool, url).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<Vec<Action>>(template.actions) {
            Ok(actions) if !actions.is_empty() => Ok(Some(actions)),
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!(url, error = %e, "Discarding malformed cached template");
                Ok(None)
            }
        }
    }

    async fn store(&self, url: &str, actions: &[Action]) -> Result<(), sqlx::Error> {
        let payload = serde_json::to_value(actions)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        TemplateRepo::upsert(&self.pool, url, &payload).await?;
        tracing::info!(url, count = actions.len(), "Cached action template");
        Ok(())
    }
}
