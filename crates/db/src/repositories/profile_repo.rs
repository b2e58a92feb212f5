//! Repository for the `profiles` table.

use sqlx::PgPool;

use formflow_core::types::DbId;

use crate::models::profile::{CreateProfile, Profile};

const COLUMNS: &str = "id, name, payload, created_at, updated_at";

/// Provides CRUD and learned-data operations for user profiles.
pub struct ProfileRepo;

impl ProfileRepo {
    pub async fn create(pool: &PgPool, input: &CreateProfile) -> Result<Profile, sqlx::Error> {
        let query = format!(
            "INSERT INTO profiles (name, payload) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Profile>(&query)
            .bind(&input.name)
            .bind(&input.payload)
            .fetch_one(pool)
            .await
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Profile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM profiles WHERE id = $1");
        sqlx::query_as::<_, Profile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Just the payload mapping, for ProfileData assembly.
    pub async fn payload(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar::<_, serde_json::Value>("SELECT payload FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Merge one learned key/value into the payload. Single-statement
    /// JSONB merge so concurrent learners don't lose each other's keys.
    pub async fn merge_learned_value(
        pool: &PgPool,
        id: DbId,
        key: &str,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        let kv = serde_json::json!({ key: value });
        sqlx::query(
            "UPDATE profiles SET payload = payload || $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(kv)
        .execute(pool)
        .await?;
        Ok(())
    }
}
