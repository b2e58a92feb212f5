//! The job execution engine.
//!
//! Given a live page, a profile, and the job controls, the
//! [`orchestrator::Orchestrator`] runs the multi-step analyze / plan /
//! execute / validate loop: it snapshots the visible DOM, obtains an
//! action list from the template cache or the plan generator, applies it
//! through the [`executor`], and decides step completion. Everything
//! here is browser- and storage-agnostic behind the `formflow-browser`
//! traits and the [`cache::TemplateCache`] seam.

pub mod cache;
pub mod controls;
pub mod error;
pub mod executor;
pub mod html;
pub mod orchestrator;
pub mod plan;
pub mod registry;

pub use cache::{PgTemplateCache, TemplateCache};
pub use controls::{AskKind, AutomationLogger, JobControls, ProfileData, SKIP_SENTINEL};
pub use error::AutomationError;
pub use executor::{ActionExecutor, ExecutionReport};
pub use orchestrator::{Orchestrator, RunConfig};
pub use plan::{MissingField, PlanGenerator, Planner};
pub use registry::{
    ExecutionContext, ExecutorRegistry, FormSubmissionExecutor, JobExecutor, ScraperExecutor,
    DEFAULT, FORM_SUBMISSION, SCRAPER,
};
