//! Persisted runtime settings.
//!
//! Settings are shared with the external dashboard through a JSON file
//! and are re-read at use time, never cached: an operator change to the
//! concurrency limit or the model pair takes effect on the next worker
//! iteration without a restart.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::keywords::DEFAULT_SUCCESS_KEYWORDS;

/// Queue and retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueSettings {
    /// Retries allowed before a job is marked DEAD.
    pub max_retries: u32,
    /// Base backoff for navigation retries, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Maximum number of concurrently executing jobs.
    pub concurrency: usize,
    /// Priority assigned to newly created jobs.
    pub default_priority: i32,
    /// Force retried jobs to the urgent priority sentinel.
    pub retry_escalation: bool,
    /// Idle poll interval for the claim loop, in milliseconds.
    pub poll_interval_ms: u64,
    /// When set, an urgent job is claimed alone, blocking other claims
    /// for that iteration.
    pub exclusive_priority: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_retries: env_or("MAX_RETRIES", 2),
            retry_backoff_ms: env_or("RETRY_BACKOFF_MS", 2000),
            concurrency: env_or("CONCURRENCY", 1),
            default_priority: 0,
            retry_escalation: false,
            poll_interval_ms: 2000,
            exclusive_priority: false,
        }
    }
}

/// Browser/form execution behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormSettings {
    pub headless: bool,
    pub page_load_timeout_ms: u64,
    pub element_wait_timeout_ms: u64,
    /// Completion phrases scanned for on every step. Heuristic allowlist.
    pub success_keywords: Vec<String>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            headless: std::env::var("HEADLESS").map(|v| v != "false").unwrap_or(true),
            page_load_timeout_ms: env_or("PAGE_LOAD_TIMEOUT_MS", 60_000),
            element_wait_timeout_ms: env_or("ELEMENT_WAIT_TIMEOUT_MS", 10_000),
            success_keywords: DEFAULT_SUCCESS_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Reasoning backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelSettings {
    pub primary_model: String,
    pub fallback_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            primary_model: "openai/gpt-4o-mini".to_string(),
            fallback_model: "google/gemini-flash-1.5".to_string(),
            api_key: std::env::var("OPENROUTER_API_KEY").ok(),
        }
    }
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    pub queue: QueueSettings,
    pub form: FormSettings,
    pub models: ModelSettings,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// File-backed settings store.
///
/// `load` merges the file over env-seeded defaults; a missing or
/// malformed file degrades to defaults with a warning so the worker
/// never refuses to start over a settings typo.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted at `FORMFLOW_SETTINGS_PATH`, or `config/settings.json`.
    pub fn from_env() -> Self {
        let path = std::env::var("FORMFLOW_SETTINGS_PATH")
            .unwrap_or_else(|_| "config/settings.json".to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current settings. Called at use time on every consumer
    /// decision point; never cached.
    pub fn load(&self) -> SystemSettings {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<SystemSettings>(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Malformed settings file, using defaults",
                    );
                    SystemSettings::default()
                }
            },
            Err(_) => SystemSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = SystemSettings::default();
        assert_eq!(s.queue.concurrency.max(1), s.queue.concurrency);
        assert!(s.form.page_load_timeout_ms >= s.form.element_wait_timeout_ms);
        assert!(!s.form.success_keywords.is_empty());
        assert_ne!(s.models.primary_model, s.models.fallback_model);
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let parsed: SystemSettings =
            serde_json::from_str(r#"{"queue": {"concurrency": 4}}"#).unwrap();
        assert_eq!(parsed.queue.concurrency, 4);
        // Untouched sections keep their defaults.
        assert_eq!(parsed.queue.poll_interval_ms, 2000);
        assert!(!parsed.form.success_keywords.is_empty());
    }

    #[test]
    fn missing_file_degrades_to_defaults() {
        let store = SettingsStore::new("/nonexistent/settings.json");
        let s = store.load();
        assert_eq!(s.queue.poll_interval_ms, 2000);
    }

    #[test]
    fn api_key_is_not_serialized_when_absent() {
        let s = ModelSettings {
            api_key: None,
            ..ModelSettings::default()
        };
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("apiKey").is_none());
    }
}
