//! Form template cache entity model.

use serde::Serialize;
use sqlx::FromRow;

use formflow_core::types::{DbId, Timestamp};

/// A row from the `form_templates` table: the cached action sequence for
/// one URL, enabling fast replay without a reasoning round-trip. At most
/// one template exists per URL (unique key).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormTemplate {
    pub id: DbId,
    pub url: String,
    pub name: Option<String>,
    /// Ordered `Action` list as JSONB.
    pub actions: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
