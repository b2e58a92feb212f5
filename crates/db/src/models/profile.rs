//! Profile entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use formflow_core::types::{DbId, Timestamp};

/// A row from the `profiles` table: a named, reusable mapping of form
/// field labels/keys to string values. Mutated by learned-data writes
/// when a human answers a question during job execution.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub id: DbId,
    pub name: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a profile.
#[derive(Debug, Deserialize)]
pub struct CreateProfile {
    pub name: String,
    pub payload: serde_json::Value,
}
