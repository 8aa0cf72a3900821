//! Food Cost Management Platform - import job runner
//!
//! Drains pending invoice-import jobs sequentially. Running jobs one at a
//! time keeps the one-mutation-per-establishment contract without needing a
//! scheduler here.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fcm_backend::config::Settings;
use fcm_backend::external::{AlertDispatcher, AlertSender, NoopAlerts, SmsGateway};
use fcm_backend::services::{
    CatalogService, ImportService, LedgerService, PropagationService,
};
use fcm_backend::store::{Direction, PgStore, Query, Store};

use shared::models::{ImportJob, JobStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fcm_jobs=debug,fcm_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;

    tracing::info!("Starting Food Cost Management job runner");
    tracing::info!("Environment: {}", settings.environment);

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .min_connections(settings.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&settings.database.url)
        .await?;

    if settings.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let store = PgStore::new(pool);

    let sender: Arc<dyn AlertSender> = match SmsGateway::from_config(&settings.alerting) {
        Some(gateway) => Arc::new(gateway),
        None => {
            tracing::info!("Alert gateway unconfigured, alerts will be dropped");
            Arc::new(NoopAlerts)
        }
    };

    let ledger = LedgerService::with_page_size(store.clone(), settings.jobs.history_page_size);
    let propagation = PropagationService::new(store.clone(), ledger.clone());
    let catalog = CatalogService::from_config(store.clone(), &settings.catalog)?;
    let import = ImportService::new(
        store.clone(),
        catalog,
        propagation,
        AlertDispatcher::new(sender),
    );

    let pending: Vec<ImportJob> = store
        .get_all(
            Query::new()
                .eq("status", JobStatus::Pending)
                .order_by("created_at", Direction::Asc)
                .limit(settings.jobs.batch_size),
        )
        .await?;

    tracing::info!("Found {} pending import jobs", pending.len());

    for job in pending {
        match import.run_job(job.id).await {
            Ok(outcome) => tracing::info!(
                job = %job.id,
                articles = outcome.articles_written,
                recipes = outcome.recipes_recomputed.len(),
                "import job completed"
            ),
            Err(err) => tracing::error!(job = %job.id, error = %err, "import job failed"),
        }
    }

    Ok(())
}
