//! The claim loop.
//!
//! One worker process owns up to `concurrency` simultaneously running
//! jobs. Claims go through `FOR UPDATE SKIP LOCKED`, so any number of
//! worker processes can share a queue without coordination.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use formflow_automation::{AutomationError, AutomationLogger, ExecutionContext, ExecutorRegistry};
use formflow_core::settings::SettingsStore;
use formflow_db::models::job::Job;
use formflow_db::models::status::StatusId;
use formflow_db::repositories::job_repo::JobRepo;

use crate::controls::{DbAutomationLogger, DbJobControls};
use crate::profile_data::build_profile_data;

/// What to do with a job whose run returned an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The user asked for the stop; no retry.
    Cancelled,
    /// Requeue, optionally escalated to the urgent priority sentinel.
    Retry { escalate: bool },
    /// Retry budget exhausted.
    Dead,
}

impl FailureOutcome {
    pub fn classify(
        error: &AutomationError,
        status: StatusId,
        retries: u32,
        max_retries: u32,
        escalation_enabled: bool,
    ) -> Self {
        if error.is_cancellation() || JobRepo::is_stop_status(status) {
            return Self::Cancelled;
        }
        if retries >= max_retries {
            return Self::Dead;
        }
        Self::Retry {
            escalate: escalation_enabled,
        }
    }
}

pub struct Worker {
    pool: PgPool,
    registry: Arc<ExecutorRegistry>,
    settings: SettingsStore,
    shutdown: CancellationToken,
}

impl Worker {
    pub fn new(
        pool: PgPool,
        registry: Arc<ExecutorRegistry>,
        settings: SettingsStore,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            registry,
            settings,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<(), sqlx::Error> {
        let swept = JobRepo::fail_stuck_jobs(&self.pool).await?;
        if swept > 0 {
            tracing::warn!(count = swept, "Swept jobs orphaned by an unclean shutdown");
        }

        let mut active: JoinSet<()> = JoinSet::new();
        loop {
            // Settings are re-read every iteration so operator changes
            // to concurrency or polling apply without a restart.
            let settings = self.settings.load();
            let poll = Duration::from_millis(settings.queue.poll_interval_ms);

            while active.try_join_next().is_some() {}

            let free = settings.queue.concurrency.saturating_sub(active.len());
            if free == 0 {
                // Saturated: wait for any running job to settle.
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = active.join_next() => {}
                }
                continue;
            }

            if let Err(e) = self.claim_and_spawn(&mut active, free, &settings).await {
                tracing::error!(error = %e, "Claim iteration failed");
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(poll) => {}
            }
        }

        tracing::info!(in_flight = active.len(), "Shutting down, draining running jobs");
        while active.join_next().await.is_some() {}
        Ok(())
    }

    async fn claim_and_spawn(
        &mut self,
        active: &mut JoinSet<()>,
        free: usize,
        settings: &formflow_core::settings::SystemSettings,
    ) -> Result<(), sqlx::Error> {
        // In exclusive mode an urgent job is claimed alone so it never
        // shares browser resources with bulk work.
        let limit = if settings.queue.exclusive_priority
            && JobRepo::has_urgent_pending(&self.pool).await?
        {
            1
        } else {
            free as i64
        };

        let jobs = JobRepo::claim_pending(&self.pool, limit).await?;
        for job in jobs {
            tracing::info!(
                job_id = job.id,
                job_type = %job.job_type,
                priority = job.priority,
                retries = job.retries,
                "Claimed job",
            );
            let pool = self.pool.clone();
            let registry = Arc::clone(&self.registry);
            let settings_store = self.settings.clone();
            active.spawn(async move {
                handle_job(pool, registry, settings_store, job).await;
            });
        }
        Ok(())
    }
}

async fn handle_job(
    pool: PgPool,
    registry: Arc<ExecutorRegistry>,
    settings: SettingsStore,
    job: Job,
) {
    let logger = Arc::new(DbAutomationLogger::new(pool.clone(), job.id));
    let controls = Arc::new(DbJobControls::new(pool.clone(), job.id, job.profile_id));

    let profile = match build_profile_data(&pool, &job).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(job_id = job.id, error = %e, "Failed to assemble profile data");
            finalize_failure(&pool, &job, &settings, &AutomationError::Storage(e)).await;
            return;
        }
    };

    let Some(executor) = registry.resolve(&job.job_type) else {
        logger
            .log(
                "error",
                &format!("No executor registered for job type {}", job.job_type),
                None,
            )
            .await;
        finalize_failure(
            &pool,
            &job,
            &settings,
            &AutomationError::Internal(format!("unknown job type {}", job.job_type)),
        )
        .await;
        return;
    };

    let ctx = ExecutionContext {
        job_id: job.id,
        url: job.url.clone(),
        job_type: job.job_type.clone(),
        profile,
        logger: logger.clone(),
        controls,
    };

    match executor.run(ctx).await {
        Ok(()) => {
            match JobRepo::mark_completed(&pool, job.id).await {
                Ok(true) => logger.log("info", "Job completed", None).await,
                Ok(false) => {
                    tracing::info!(job_id = job.id, "Completion skipped, terminal status already set")
                }
                Err(e) => tracing::error!(job_id = job.id, error = %e, "Failed to mark completed"),
            }
        }
        Err(e) => {
            logger.log("error", &format!("Job failed: {e}"), None).await;
            finalize_failure(&pool, &job, &settings, &e).await;
        }
    }
}

async fn finalize_failure(
    pool: &PgPool,
    job: &Job,
    settings: &SettingsStore,
    error: &AutomationError,
) {
    let status = match JobRepo::status(pool, job.id).await {
        Ok(Some(status)) => status,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(job_id = job.id, error = %e, "Failed to read job status");
            return;
        }
    };

    let queue = settings.load().queue;
    let outcome = FailureOutcome::classify(
        error,
        status,
        job.retries.max(0) as u32,
        queue.max_retries,
        queue.retry_escalation,
    );

    let result = match outcome {
        FailureOutcome::Cancelled => {
            tracing::info!(job_id = job.id, "Job cancelled");
            JobRepo::mark_cancelled(pool, job.id).await
        }
        FailureOutcome::Retry { escalate } => {
            tracing::warn!(
                job_id = job.id,
                retries = job.retries,
                escalate,
                "Requeueing job for retry",
            );
            JobRepo::requeue_for_retry(pool, job.id, escalate).await
        }
        FailureOutcome::Dead => {
            tracing::error!(job_id = job.id, retries = job.retries, "Retry budget exhausted");
            JobRepo::mark_dead(pool, job.id).await
        }
    };
    if let Err(e) = result {
        tracing::error!(job_id = job.id, error = %e, "Failed to finalize job failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_db::models::status::JobStatus;

    fn internal() -> AutomationError {
        AutomationError::Internal("boom".to_string())
    }

    #[test]
    fn cancellation_errors_cancel_regardless_of_retries() {
        let outcome = FailureOutcome::classify(
            &AutomationError::UserCancelled,
            JobStatus::Processing.id(),
            0,
            2,
            false,
        );
        assert_eq!(outcome, FailureOutcome::Cancelled);
    }

    #[test]
    fn stop_status_cancels_even_on_plain_errors() {
        let outcome = FailureOutcome::classify(
            &internal(),
            JobStatus::Cancelling.id(),
            0,
            2,
            false,
        );
        assert_eq!(outcome, FailureOutcome::Cancelled);
    }

    #[test]
    fn budget_left_means_retry() {
        let outcome =
            FailureOutcome::classify(&internal(), JobStatus::Processing.id(), 1, 2, false);
        assert_eq!(outcome, FailureOutcome::Retry { escalate: false });
    }

    #[test]
    fn escalation_setting_flows_through() {
        let outcome =
            FailureOutcome::classify(&internal(), JobStatus::Processing.id(), 0, 2, true);
        assert_eq!(outcome, FailureOutcome::Retry { escalate: true });
    }

    #[test]
    fn exhausted_budget_is_dead() {
        let outcome =
            FailureOutcome::classify(&internal(), JobStatus::Processing.id(), 2, 2, false);
        assert_eq!(outcome, FailureOutcome::Dead);
    }
}
