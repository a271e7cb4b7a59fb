//! Batchline maintenance worker runtime.

#![forbid(unsafe_code)]

mod job_runtime;
mod worker_config;

use std::env;
use std::time::Duration;

use batchline_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::job_runtime::{JobRuntime, run_on_interval, run_once};
use crate::worker_config::WorkerConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
    let config = WorkerConfig::load()?;
    let pool = connect_pool(
        config.database_url.as_str(),
        config.database_max_connections,
    )
    .await?;

    if migrate_only {
        run_migrations(&pool).await?;
        info!("database migrations applied");
        return Ok(());
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let runtime = JobRuntime::new(&config, pool, http_client)?;
    let schedules = runtime.schedules(&config)?;

    info!(
        worker_id = %config.worker_id,
        lease_backend = runtime.lease_backend(),
        run_once = config.run_once,
        job_count = schedules.len(),
        report_sink = config.report_url.is_some(),
        "batchline-worker started"
    );

    if schedules.is_empty() {
        warn!(worker_id = %config.worker_id, "no maintenance jobs are enabled");
        return Ok(());
    }

    if config.run_once {
        for report in run_once(&schedules).await {
            let line = serde_json::to_string(&report).map_err(|error| {
                AppError::Internal(format!("failed to serialize run report: {error}"))
            })?;
            println!("{line}");
        }

        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = schedules
        .into_iter()
        .map(|schedule| tokio::spawn(run_on_interval(schedule, shutdown_rx.clone())))
        .collect::<Vec<_>>();

    tokio::signal::ctrl_c()
        .await
        .map_err(|error| AppError::Internal(format!("failed to listen for shutdown: {error}")))?;
    info!(worker_id = %config.worker_id, "shutdown requested, waiting for running jobs");

    if shutdown_tx.send(true).is_err() {
        warn!(worker_id = %config.worker_id, "all job schedules already stopped");
    }

    for handle in handles {
        if let Err(error) = handle.await {
            warn!(worker_id = %config.worker_id, error = %error, "job schedule task failed");
        }
    }

    info!(worker_id = %config.worker_id, "batchline-worker stopped");
    Ok(())
}

async fn connect_pool(database_url: &str, max_connections: u32) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
