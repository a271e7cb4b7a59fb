use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batchline_application::{
    ARTIFACT_EXPIRY_JOB, ArtifactExpiryBacklog, ArtifactExpiryExecutor, BatchCoordinator, Clock,
    CursorCheckpointStore, CursorStrategy, ENVIRONMENT_AUTO_STOP_JOB, EnvironmentAutoStopBacklog,
    EnvironmentAutoStopExecutor, IdempotentDispatcher, LeaseManager, LeaseStore, LoopGovernor,
    RunReportSink,
};
use batchline_core::{AppError, AppResult};
use batchline_domain::{EnvironmentStopItem, ExpiredArtifactItem, JobName, RunReport, WorkItem};
use batchline_infrastructure::{
    HttpRunReportSink, InMemoryCursorCheckpointStore, PostgresArtifactRepository,
    PostgresEnvironmentRepository, PostgresLeaseStore, RedisCursorCheckpointStore,
    RedisLeaseStore, SystemClock,
};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::worker_config::{JobConfig, WorkerConfig};

/// A coordinator the scheduler can trigger without knowing its item type.
#[async_trait]
pub(crate) trait ScheduledJob: Send + Sync {
    fn job_name(&self) -> &JobName;

    async fn trigger(&self) -> RunReport;
}

#[async_trait]
impl<I: WorkItem> ScheduledJob for BatchCoordinator<I> {
    fn job_name(&self) -> &JobName {
        BatchCoordinator::job_name(self)
    }

    async fn trigger(&self) -> RunReport {
        self.execute().await
    }
}

/// A scheduled job together with its trigger period.
pub(crate) struct JobSchedule {
    pub(crate) job: Arc<dyn ScheduledJob>,
    pub(crate) interval: Duration,
}

/// Shared adapters used to assemble every maintenance job.
pub(crate) struct JobRuntime {
    pool: PgPool,
    redis_client: Option<redis::Client>,
    redis_key_prefix: String,
    worker_id: String,
    clock: Arc<dyn Clock>,
    checkpoint_store: Arc<dyn CursorCheckpointStore>,
    report_sink: Option<Arc<dyn RunReportSink>>,
}

impl JobRuntime {
    pub(crate) fn new(
        config: &WorkerConfig,
        pool: PgPool,
        http_client: reqwest::Client,
    ) -> AppResult<Self> {
        let redis_client = config
            .redis_url
            .as_deref()
            .map(|redis_url| {
                redis::Client::open(redis_url).map_err(|error| {
                    AppError::Validation(format!("invalid REDIS_URL '{redis_url}': {error}"))
                })
            })
            .transpose()?;

        let checkpoint_store: Arc<dyn CursorCheckpointStore> = match &redis_client {
            Some(client) => Arc::new(RedisCursorCheckpointStore::new(
                client.clone(),
                format!("{}:cursor", config.redis_key_prefix),
            )),
            None => Arc::new(InMemoryCursorCheckpointStore::new()),
        };

        let report_sink = config.report_url.as_ref().map(|report_url| {
            Arc::new(HttpRunReportSink::new(
                http_client,
                report_url.clone(),
                config.report_token.clone(),
            )) as Arc<dyn RunReportSink>
        });

        Ok(Self {
            pool,
            redis_client,
            redis_key_prefix: config.redis_key_prefix.clone(),
            worker_id: config.worker_id.clone(),
            clock: Arc::new(SystemClock),
            checkpoint_store,
            report_sink,
        })
    }

    /// Returns which backend coordinates leases across worker processes.
    pub(crate) fn lease_backend(&self) -> &'static str {
        if self.redis_client.is_some() {
            "redis"
        } else {
            "postgres"
        }
    }

    /// Builds the schedules for every enabled job.
    pub(crate) fn schedules(&self, config: &WorkerConfig) -> AppResult<Vec<JobSchedule>> {
        let mut schedules = Vec::new();

        if config.environment_auto_stop.enabled {
            schedules.push(JobSchedule {
                job: Arc::new(self.environment_auto_stop(&config.environment_auto_stop)?),
                interval: config.environment_auto_stop.interval,
            });
        }

        if config.artifact_expiry.enabled {
            schedules.push(JobSchedule {
                job: Arc::new(self.artifact_expiry(&config.artifact_expiry)?),
                interval: config.artifact_expiry.interval,
            });
        }

        Ok(schedules)
    }

    fn environment_auto_stop(
        &self,
        job: &JobConfig,
    ) -> AppResult<BatchCoordinator<EnvironmentStopItem>> {
        let repository = Arc::new(PostgresEnvironmentRepository::new(self.pool.clone()));
        let backlog = Arc::new(EnvironmentAutoStopBacklog::new(
            repository.clone(),
            self.clock.clone(),
        ));
        let executor = Arc::new(EnvironmentAutoStopExecutor::new(repository));
        let dispatcher = IdempotentDispatcher::new(executor, job.concurrency, job.item_timeout)?;

        let coordinator = BatchCoordinator::new(
            JobName::new(ENVIRONMENT_AUTO_STOP_JOB)?,
            job.settings.clone(),
            self.lease_manager()?,
            LoopGovernor::new(self.clock.clone()).with_pause(job.pause),
            backlog,
            dispatcher,
            self.clock.clone(),
        )?;

        Ok(self.with_report_sink(coordinator))
    }

    fn artifact_expiry(
        &self,
        job: &JobConfig,
    ) -> AppResult<BatchCoordinator<ExpiredArtifactItem>> {
        let repository = Arc::new(PostgresArtifactRepository::new(self.pool.clone()));
        let backlog = Arc::new(ArtifactExpiryBacklog::new(
            repository.clone(),
            self.clock.clone(),
        ));
        let executor = Arc::new(ArtifactExpiryExecutor::new(repository, self.clock.clone()));
        let dispatcher = IdempotentDispatcher::new(executor, job.concurrency, job.item_timeout)?;

        let coordinator = BatchCoordinator::new(
            JobName::new(ARTIFACT_EXPIRY_JOB)?,
            job.settings.clone(),
            self.lease_manager()?,
            LoopGovernor::new(self.clock.clone()).with_pause(job.pause),
            backlog,
            dispatcher,
            self.clock.clone(),
        )?
        .with_cursor_strategy(CursorStrategy::Checkpointed(
            self.checkpoint_store.clone(),
        ));

        Ok(self.with_report_sink(coordinator))
    }

    fn lease_manager(&self) -> AppResult<LeaseManager> {
        let store: Arc<dyn LeaseStore> = match &self.redis_client {
            Some(client) => Arc::new(RedisLeaseStore::new(
                client.clone(),
                format!("{}:lease", self.redis_key_prefix),
                self.clock.clone(),
            )),
            None => Arc::new(PostgresLeaseStore::new(self.pool.clone())),
        };

        LeaseManager::new(store, self.worker_id.clone())
    }

    fn with_report_sink<I: WorkItem>(
        &self,
        coordinator: BatchCoordinator<I>,
    ) -> BatchCoordinator<I> {
        match &self.report_sink {
            Some(sink) => coordinator.with_report_sink(sink.clone()),
            None => coordinator,
        }
    }
}

/// Triggers every job once, in order, and returns their reports.
pub(crate) async fn run_once(schedules: &[JobSchedule]) -> Vec<RunReport> {
    let mut reports = Vec::with_capacity(schedules.len());
    for schedule in schedules {
        reports.push(schedule.job.trigger().await);
    }

    reports
}

/// Triggers a job on its interval until shutdown is signalled.
///
/// Ticks missed while a run is still in progress are skipped, so one worker
/// never queues up overlapping runs of the same job.
pub(crate) async fn run_on_interval(schedule: JobSchedule, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        job_name = %schedule.job.job_name(),
        interval_seconds = schedule.interval.as_secs(),
        "job scheduled"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = schedule.job.trigger().await;
                if report.error.is_some() {
                    warn!(
                        job_name = %report.job_name,
                        outcome = report.outcome.as_str(),
                        "job run ended with an error, retrying on next tick"
                    );
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(job_name = %schedule.job.job_name(), "job schedule stopped");
                    break;
                }
            }
        }
    }
}
