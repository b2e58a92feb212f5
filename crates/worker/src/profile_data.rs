//! ProfileData assembly for one claimed job.

use std::collections::BTreeMap;

use sqlx::PgPool;

use formflow_automation::ProfileData;
use formflow_core::dates::date_context;
use formflow_db::models::job::Job;
use formflow_db::repositories::profile_repo::ProfileRepo;

/// Build the merged fill context for a job, later sources winning:
/// profile payload, then job custom_data, then the uploaded file path,
/// then the current-date context.
pub async fn build_profile_data(pool: &PgPool, job: &Job) -> Result<ProfileData, sqlx::Error> {
    let mut data = ProfileData::new(Some(job.id), job.profile_id);

    if let Some(profile_id) = job.profile_id {
        if let Some(payload) = ProfileRepo::payload(pool, profile_id).await? {
            data.merge(flatten(&payload));
        }
    }

    data.merge(flatten(&job.custom_data));

    if let Some(path) = &job.file_path {
        data.insert("uploaded_file_path", path.clone());
    }

    data.merge(date_context(chrono::Utc::now()));

    Ok(data)
}

/// Flatten a JSON object into string values. Mailbox bookkeeping keys
/// (underscore-prefixed) never reach the fill context.
fn flatten(value: &serde_json::Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Some(obj) = value.as_object() else {
        return out;
    };
    for (key, val) in obj {
        if key.starts_with('_') {
            continue;
        }
        let rendered = match val {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => continue,
            other => other.to_string(),
        };
        out.insert(key.clone(), rendered);
    }
    out
}
