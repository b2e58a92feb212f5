//! The multi-step form loop: analyze, plan, execute, validate, repeat
//! until a success keyword appears or the step cap is hit.

use std::sync::Arc;
use std::time::Duration;

use formflow_browser::page::Page;
use formflow_core::action::Action;
use formflow_core::keywords::SuccessMatcher;

use crate::cache::TemplateCache;
use crate::controls::{AutomationLogger, JobControls, ProfileData};
use crate::error::AutomationError;
use crate::executor::{ActionExecutor, ExecutionReport};
use crate::html::{clean_html, merge_frames};
use crate::plan::Planner;

/// Per-run tunables, resolved from settings by the caller.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Hard cap on steps; exhaustion fails the job.
    pub max_steps: u32,
    pub page_load_timeout: Duration,
    pub element_timeout: Duration,
    pub navigation_retries: u32,
    pub navigation_backoff: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: 15,
            page_load_timeout: Duration::from_millis(60_000),
            element_timeout: Duration::from_millis(10_000),
            navigation_retries: 3,
            navigation_backoff: Duration::from_millis(2_000),
        }
    }
}

/// Runs one job end to end on an already-opened page.
pub struct Orchestrator {
    templates: Arc<dyn TemplateCache>,
    planner: Arc<dyn Planner>,
    executor: ActionExecutor,
    success: SuccessMatcher,
    config: RunConfig,
}

impl Orchestrator {
    pub fn new(
        templates: Arc<dyn TemplateCache>,
        planner: Arc<dyn Planner>,
        executor: ActionExecutor,
        success: SuccessMatcher,
        config: RunConfig,
    ) -> Self {
        Self {
            templates,
            planner,
            executor,
            success,
            config,
        }
    }

    pub async fn run(
        &self,
        page: &dyn Page,
        url: &str,
        profile: &ProfileData,
        logger: &dyn AutomationLogger,
        controls: &dyn JobControls,
    ) -> Result<(), AutomationError> {
        self.navigate(page, url).await?;
        logger.log("info", &format!("Loaded {url}"), None).await;

        // One failed replay bypasses the cache for the rest of the run;
        // the stored template is kept for jobs where it still works.
        let mut cache_bypassed = false;
        let mut settled = true;

        for step in 1..=self.config.max_steps {
            controls.check_pause().await?;

            if !settled {
                if !page.wait_for_network_idle(self.config.element_timeout).await {
                    page.wait(Duration::from_millis(2_000)).await;
                }
            }

            let text = page.visible_text().await?;
            if self.success.matches(&text) {
                logger
                    .log("info", &format!("Success detected at step {step}"), None)
                    .await;
                return Ok(());
            }

            let snapshot = self.snapshot(page).await?;

            let mut from_cache = false;
            let mut from_recovery = false;
            let mut plan: Vec<Action> = Vec::new();
            if step == 1 && !cache_bypassed {
                match self.templates.lookup(url).await {
                    Ok(Some(cached)) => {
                        logger
                            .log("info", &format!("Replaying cached template ({} actions)", cached.len()), None)
                            .await;
                        from_cache = true;
                        plan = cached;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(url, error = %e, "Template lookup failed, planning instead");
                    }
                }
            }
            if plan.is_empty() {
                plan = self.planner.generate(&snapshot, profile).await?;
            }

            if plan.is_empty() {
                // Nothing to do per the planner; double-check with the
                // recovery pass before declaring the form done.
                let missing = self.planner.validate(&snapshot).await?;
                if missing.is_empty() {
                    logger
                        .log("info", &format!("No actions and no missing fields at step {step}"), None)
                        .await;
                    return Ok(());
                }
                from_recovery = true;
                plan = missing
                    .into_iter()
                    .map(|m| Action::ask_user(m.selector, m.label))
                    .collect();
            }

            let report: ExecutionReport = self
                .executor
                .execute(page, &plan, profile, logger, controls, Some(self.planner.as_ref()))
                .await?;
            settled = !report.did_navigate;

            if report.failed > 0 {
                logger
                    .log(
                        "warning",
                        &format!("Step {step}: {} of {} actions failed, re-analyzing", report.failed, plan.len()),
                        None,
                    )
                    .await;
                if from_cache {
                    cache_bypassed = true;
                }
                continue;
            }

            // Only planner-generated plans are worth replaying; a
            // recovery plan is just human prompts for one stuck run.
            if step == 1 && !from_cache && !from_recovery {
                if let Err(e) = self.templates.store(url, &plan).await {
                    tracing::warn!(url, error = %e, "Failed to cache action template");
                }
            }
        }

        Err(AutomationError::StepLimit {
            steps: self.config.max_steps,
        })
    }

    /// Bounded navigation retry with exponential backoff.
    async fn navigate(&self, page: &dyn Page, url: &str) -> Result<(), AutomationError> {
        let mut last = None;
        for attempt in 1..=self.config.navigation_retries {
            match page.navigate(url, self.config.page_load_timeout).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "Navigation failed");
                    last = Some(e);
                    if attempt < self.config.navigation_retries {
                        page.wait(self.config.navigation_backoff * 2u32.pow(attempt - 1))
                            .await;
                    }
                }
            }
        }
        Err(AutomationError::Navigation {
            url: url.to_string(),
            source: last.unwrap_or_else(|| formflow_browser::BrowserError::Navigation {
                url: url.to_string(),
                reason: "no attempts made".to_string(),
            }),
        })
    }

    /// Visible snapshot of the main document plus same-origin frames,
    /// cleaned for prompt embedding.
    async fn snapshot(&self, page: &dyn Page) -> Result<String, AutomationError> {
        let main = page.visible_snapshot().await?;
        let frames = page.frame_contents().await;
        Ok(clean_html(&merge_frames(&main, &frames)))
    }
}
