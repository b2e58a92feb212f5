//! Worker entry point: wiring and lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use formflow_automation::{
    ExecutorRegistry, FormSubmissionExecutor, PgTemplateCache, ScraperExecutor, DEFAULT,
    FORM_SUBMISSION, SCRAPER,
};
use formflow_browser::page::{BrowserProvider, LaunchOptions, Page};
use formflow_browser::BrowserError;
use formflow_core::settings::SettingsStore;
use formflow_worker::Worker;

/// Placeholder provider. Real browser bindings (CDP, WebDriver) ship as
/// separate crates implementing [`BrowserProvider`] and replace this in
/// the wiring below; until then every form job fails with a clear
/// launch error instead of hanging.
struct UnconfiguredBrowser;

#[async_trait]
impl BrowserProvider for UnconfiguredBrowser {
    async fn open_page(
        &self,
        _options: &LaunchOptions,
    ) -> Result<Arc<dyn Page>, BrowserError> {
        Err(BrowserError::Launch(
            "no browser binding configured".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "formflow_worker=debug,formflow_automation=debug,formflow_db=info,info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    formflow_db::MIGRATOR.run(&pool).await?;
    formflow_db::health_check(&pool).await?;
    tracing::info!("Database ready");

    let settings = SettingsStore::from_env();
    let upload_root = std::env::var("UPLOAD_ROOT").ok();

    let browser: Arc<dyn BrowserProvider> = Arc::new(UnconfiguredBrowser);
    let templates = Arc::new(PgTemplateCache::new(pool.clone()));
    let form_executor = Arc::new(FormSubmissionExecutor::new(
        browser,
        templates,
        settings.clone(),
        upload_root,
    ));

    let mut registry = ExecutorRegistry::new();
    registry.register(FORM_SUBMISSION, form_executor.clone());
    registry.register(DEFAULT, form_executor);
    registry.register(SCRAPER, Arc::new(ScraperExecutor));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    Worker::new(pool, Arc::new(registry), settings, shutdown)
        .run()
        .await?;
    tracing::info!("Worker stopped");
    Ok(())
}
