//! Job type dispatch.
//!
//! Executors are registered once at startup and resolved per job by
//! the worker; an unknown job type falls back to the default executor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use formflow_browser::page::{BrowserProvider, LaunchOptions};
use formflow_core::keywords::SuccessMatcher;
use formflow_core::settings::SettingsStore;
use formflow_core::types::DbId;

use crate::cache::TemplateCache;
use crate::controls::{AutomationLogger, JobControls, ProfileData};
use crate::error::AutomationError;
use crate::executor::ActionExecutor;
use crate::orchestrator::{Orchestrator, RunConfig};
use crate::plan::PlanGenerator;

pub const FORM_SUBMISSION: &str = "FORM_SUBMISSION";
pub const SCRAPER: &str = "SCRAPER";
pub const DEFAULT: &str = "DEFAULT";

/// Everything one job execution needs, assembled by the worker.
pub struct ExecutionContext {
    pub job_id: DbId,
    pub url: String,
    pub job_type: String,
    pub profile: ProfileData,
    pub logger: Arc<dyn AutomationLogger>,
    pub controls: Arc<dyn JobControls>,
}

#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn run(&self, ctx: ExecutionContext) -> Result<(), AutomationError>;
}

/// Explicit executor map; no global state.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn JobExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_type: impl Into<String>, executor: Arc<dyn JobExecutor>) {
        self.executors.insert(job_type.into(), executor);
    }

    /// The executor for `job_type`, falling back to [`DEFAULT`].
    pub fn resolve(&self, job_type: &str) -> Option<Arc<dyn JobExecutor>> {
        self.executors
            .get(job_type)
            .or_else(|| self.executors.get(DEFAULT))
            .cloned()
    }
}

/// The orchestrator-backed form submission executor.
///
/// Settings are re-read on every run, so model and timeout changes
/// apply to the next job without a restart.
pub struct FormSubmissionExecutor {
    browser: Arc<dyn BrowserProvider>,
    templates: Arc<dyn TemplateCache>,
    settings: SettingsStore,
    upload_root: Option<String>,
}

impl FormSubmissionExecutor {
    pub fn new(
        browser: Arc<dyn BrowserProvider>,
        templates: Arc<dyn TemplateCache>,
        settings: SettingsStore,
        upload_root: Option<String>,
    ) -> Self {
        Self {
            browser,
            templates,
            settings,
            upload_root,
        }
    }
}

#[async_trait]
impl JobExecutor for FormSubmissionExecutor {
    async fn run(&self, ctx: ExecutionContext) -> Result<(), AutomationError> {
        let settings = self.settings.load();

        let backend = formflow_llm::OpenRouterBackend::new(settings.models.api_key.clone());
        let reasoner = formflow_llm::Reasoner::new(
            Box::new(backend),
            settings.models.primary_model.clone(),
            settings.models.fallback_model.clone(),
        );
        let planner = Arc::new(PlanGenerator::new(reasoner));

        let element_timeout = Duration::from_millis(settings.form.element_wait_timeout_ms);
        let executor = ActionExecutor::new(element_timeout, self.upload_root.clone());
        let orchestrator = Orchestrator::new(
            Arc::clone(&self.templates),
            planner,
            executor,
            SuccessMatcher::new(&settings.form.success_keywords),
            RunConfig {
                page_load_timeout: Duration::from_millis(settings.form.page_load_timeout_ms),
                element_timeout,
                navigation_backoff: Duration::from_millis(settings.queue.retry_backoff_ms),
                ..RunConfig::default()
            },
        );

        let page = self
            .browser
            .open_page(&LaunchOptions {
                headless: settings.form.headless,
                ..LaunchOptions::default()
            })
            .await?;

        let outcome = orchestrator
            .run(
                page.as_ref(),
                &ctx.url,
                &ctx.profile,
                ctx.logger.as_ref(),
                ctx.controls.as_ref(),
            )
            .await;

        if let Err(e) = page.close().await {
            tracing::warn!(job_id = ctx.job_id, error = %e, "Page close failed");
        }
        outcome
    }
}

/// Placeholder for the scraping job family; registered so SCRAPER jobs
/// resolve without falling back to form submission.
pub struct ScraperExecutor;

#[async_trait]
impl JobExecutor for ScraperExecutor {
    async fn run(&self, ctx: ExecutionContext) -> Result<(), AutomationError> {
        ctx.logger
            .log("warning", "Scraper executor is not implemented yet", None)
            .await;
        Err(AutomationError::Internal(format!(
            "No scraper implementation for job {}",
            ctx.job_id
        )))
    }
}
