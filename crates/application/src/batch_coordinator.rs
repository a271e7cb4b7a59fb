mod settings;
mod step;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use batchline_core::AppResult;
use batchline_domain::{
    CoordinatorState, GovernorOutcome, JobName, Lease, LoopBudget, RunOutcome, RunReport,
    WorkItem,
};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::batch_ports::{BacklogSource, Clock, RunReportSink};
use crate::cursor_strategy::CursorStrategy;
use crate::idempotent_dispatcher::IdempotentDispatcher;
use crate::lease_manager::{LeaseAcquisition, LeaseManager};
use crate::loop_governor::LoopGovernor;
use crate::panic_payload::panic_message;

pub use settings::CoordinatorSettings;
use step::{BatchStep, RunProgress};

/// Entry point invoked by a trigger for one named maintenance job.
///
/// One invocation holds the job's lease, drains cursor batches through the
/// dispatcher inside a governed loop, and gives the lease back on every exit
/// path. Leftover work is picked up by the next trigger.
pub struct BatchCoordinator<I: WorkItem> {
    job_name: JobName,
    settings: CoordinatorSettings,
    lease_manager: LeaseManager,
    governor: LoopGovernor,
    backlog: Arc<dyn BacklogSource<I>>,
    dispatcher: IdempotentDispatcher<I>,
    clock: Arc<dyn Clock>,
    cursor_strategy: CursorStrategy,
    report_sinks: Vec<Arc<dyn RunReportSink>>,
}

impl<I: WorkItem> BatchCoordinator<I> {
    /// Creates a coordinator with validated settings and a re-derived cursor.
    pub fn new(
        job_name: JobName,
        settings: CoordinatorSettings,
        lease_manager: LeaseManager,
        governor: LoopGovernor,
        backlog: Arc<dyn BacklogSource<I>>,
        dispatcher: IdempotentDispatcher<I>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        settings.validate()?;
        settings.validate_batch_window(dispatcher.concurrency(), dispatcher.item_timeout())?;

        Ok(Self {
            job_name,
            settings,
            lease_manager,
            governor,
            backlog,
            dispatcher,
            clock,
            cursor_strategy: CursorStrategy::default(),
            report_sinks: Vec::new(),
        })
    }

    /// Replaces the cursor strategy.
    #[must_use]
    pub fn with_cursor_strategy(mut self, cursor_strategy: CursorStrategy) -> Self {
        self.cursor_strategy = cursor_strategy;
        self
    }

    /// Adds a sink that receives every run report.
    #[must_use]
    pub fn with_report_sink(mut self, sink: Arc<dyn RunReportSink>) -> Self {
        self.report_sinks.push(sink);
        self
    }

    /// Returns the job name used as lease key.
    #[must_use]
    pub fn job_name(&self) -> &JobName {
        &self.job_name
    }

    /// Returns the coordinator settings.
    #[must_use]
    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Runs one invocation and reports how it ended.
    ///
    /// Never returns an error: store failures and panics are reported as
    /// [`RunOutcome::Failed`] after the lease has been released.
    pub async fn execute(&self) -> RunReport {
        let started_at = self.clock.now();
        let mut transitions = Transitions::new(&self.job_name);

        transitions.move_to(CoordinatorState::Acquiring);
        let acquisition = self
            .lease_manager
            .acquire(
                &self.job_name,
                self.settings.lease_ttl,
                self.settings.lease_max_retries,
            )
            .await;

        let lease = match acquisition {
            LeaseAcquisition::Acquired(lease) => lease,
            LeaseAcquisition::Busy => {
                transitions.move_to(CoordinatorState::Idle);
                info!(job_name = %self.job_name, "lease busy, skipping run");
                let report = self.report(
                    RunOutcome::Busy,
                    &RunProgress::default(),
                    started_at,
                    None,
                    transitions.into_history(),
                );
                self.publish(&report).await;
                return report;
            }
        };

        transitions.move_to(CoordinatorState::Running);
        let mut progress = RunProgress::default();
        let run = AssertUnwindSafe(self.run_governed(lease.clone(), &mut progress))
            .catch_unwind()
            .await;

        let (outcome, failure) = match run {
            Ok(Ok(outcome)) => (RunOutcome::from(outcome), None),
            Ok(Err(run_error)) => {
                error!(
                    job_name = %self.job_name,
                    error_kind = run_error.kind(),
                    error = %run_error,
                    "batch run failed"
                );
                (RunOutcome::Failed, Some(run_error.to_string()))
            }
            Err(payload) => {
                let message = format!("batch run panicked: {}", panic_message(payload.as_ref()));
                error!(job_name = %self.job_name, error = %message, "batch run failed");
                (RunOutcome::Failed, Some(message))
            }
        };

        transitions.move_to(CoordinatorState::Releasing);
        self.finish_lease(&lease).await;
        transitions.move_to(CoordinatorState::Idle);

        let report = self.report(
            outcome,
            &progress,
            started_at,
            failure,
            transitions.into_history(),
        );
        self.publish(&report).await;
        report
    }

    async fn run_governed(
        &self,
        lease: Lease,
        progress: &mut RunProgress,
    ) -> AppResult<GovernorOutcome> {
        let Some(bounds) = self.backlog.bounds().await? else {
            debug!(job_name = %self.job_name, "backlog is empty");
            self.cursor_strategy.finish(&self.job_name).await?;
            return Ok(GovernorOutcome::Exhausted);
        };

        let cursor = self
            .cursor_strategy
            .open(&self.job_name, bounds, self.settings.batch_size)
            .await?;
        debug!(
            job_name = %self.job_name,
            bounds = %bounds,
            start = cursor.lower_bound(),
            cursor_strategy = self.cursor_strategy.as_str(),
            "cursor opened"
        );

        let mut budget = LoopBudget::starting_at(
            self.clock.now(),
            self.settings.timeout,
            self.settings.max_iterations,
        )?;
        let mut step = BatchStep::new(self, lease, cursor, progress);
        let outcome = self.governor.run(&mut budget, &mut step).await;
        progress.iterations = budget.iterations_done();

        let outcome = outcome?;
        if outcome == GovernorOutcome::Exhausted {
            self.cursor_strategy.finish(&self.job_name).await?;
        }

        Ok(outcome)
    }

    async fn finish_lease(&self, lease: &Lease) {
        if !self.settings.release_lease_on_exit {
            debug!(
                job_name = %self.job_name,
                expires_at = %lease.expires_at(),
                "keeping lease until it expires"
            );
            return;
        }

        if let Err(release_error) = self.lease_manager.release(lease).await {
            warn!(
                job_name = %self.job_name,
                error = %release_error,
                "failed to release lease, it will expire after its ttl"
            );
        }
    }

    fn report(
        &self,
        outcome: RunOutcome,
        progress: &RunProgress,
        started_at: DateTime<Utc>,
        error: Option<String>,
        transitions: Vec<CoordinatorState>,
    ) -> RunReport {
        let elapsed_ms = (self.clock.now() - started_at).num_milliseconds();

        RunReport {
            job_name: self.job_name.as_str().to_owned(),
            outcome,
            items_processed: progress.summary.succeeded,
            failed_items: progress.summary.failed,
            iterations: progress.iterations,
            started_at,
            duration_ms: u64::try_from(elapsed_ms).unwrap_or(0),
            error,
            transitions,
        }
    }

    async fn publish(&self, report: &RunReport) {
        info!(
            job_name = %report.job_name,
            outcome = report.outcome.as_str(),
            items_processed = report.items_processed,
            failed_items = report.failed_items,
            iterations = report.iterations,
            duration_ms = report.duration_ms,
            "batch run finished"
        );

        for sink in &self.report_sinks {
            if let Err(sink_error) = sink.publish(report).await {
                warn!(
                    job_name = %report.job_name,
                    error = %sink_error,
                    "failed to publish run report"
                );
            }
        }
    }
}

struct Transitions<'a> {
    job_name: &'a JobName,
    current: CoordinatorState,
    history: Vec<CoordinatorState>,
}

impl<'a> Transitions<'a> {
    fn new(job_name: &'a JobName) -> Self {
        Self {
            job_name,
            current: CoordinatorState::Idle,
            history: vec![CoordinatorState::Idle],
        }
    }

    fn move_to(&mut self, next: CoordinatorState) {
        if !self.current.can_transition_to(next) {
            warn!(
                job_name = %self.job_name,
                from = self.current.as_str(),
                to = next.as_str(),
                "unexpected coordinator state transition"
            );
        }

        self.current = next;
        self.history.push(next);
    }

    fn into_history(self) -> Vec<CoordinatorState> {
        self.history
    }
}

#[cfg(test)]
mod tests;
