use async_trait::async_trait;
use batchline_core::{AppError, AppResult};
use batchline_domain::{BatchCursor, DispatchSummary, Lease, StepResult, WorkItem};
use tracing::debug;

use crate::loop_governor::LoopStep;

use super::BatchCoordinator;

/// Counters that survive an aborted run.
#[derive(Debug, Default)]
pub(super) struct RunProgress {
    pub(super) summary: DispatchSummary,
    pub(super) iterations: u32,
}

/// One governed iteration: pull a range, fetch, dispatch, confirm the lease, commit.
pub(super) struct BatchStep<'a, I: WorkItem> {
    coordinator: &'a BatchCoordinator<I>,
    lease: Lease,
    cursor: BatchCursor,
    progress: &'a mut RunProgress,
    batches: u32,
}

impl<'a, I: WorkItem> BatchStep<'a, I> {
    pub(super) fn new(
        coordinator: &'a BatchCoordinator<I>,
        lease: Lease,
        cursor: BatchCursor,
        progress: &'a mut RunProgress,
    ) -> Self {
        Self {
            coordinator,
            lease,
            cursor,
            progress,
            batches: 0,
        }
    }

    /// Confirms the lease is still held before a dispatched batch is committed.
    ///
    /// With renewal enabled the lease is extended through the store, which
    /// also detects a new holder. Without renewal the lease must still be
    /// live by its own expiry.
    async fn confirm_lease(&mut self) -> AppResult<()> {
        let coordinator = self.coordinator;
        let owned = if coordinator.settings.renew_lease_each_batch {
            let renewed = coordinator
                .lease_manager
                .renew(&self.lease, coordinator.settings.lease_ttl)
                .await?;
            match renewed {
                Some(lease) => {
                    self.lease = lease;
                    true
                }
                None => false,
            }
        } else {
            self.lease.is_live_at(coordinator.clock.now())
        };

        if owned {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "lease for job '{}' was lost during batch {}",
                coordinator.job_name, self.batches
            )))
        }
    }
}

#[async_trait]
impl<I: WorkItem> LoopStep for BatchStep<'_, I> {
    async fn step(&mut self) -> AppResult<StepResult> {
        let coordinator = self.coordinator;
        let Some(range) = self.cursor.next_batch() else {
            return Ok(StepResult::Exhausted);
        };
        self.batches += 1;

        let items = coordinator.backlog.fetch(range).await?;
        let fetched = items.len();
        let outcomes = coordinator.dispatcher.dispatch(items).await;
        let summary = DispatchSummary::from_outcomes(&outcomes);
        self.progress.summary.absorb(summary);

        self.confirm_lease().await?;

        coordinator
            .cursor_strategy
            .commit(&coordinator.job_name, range)
            .await?;

        debug!(
            job_name = %coordinator.job_name,
            batch = self.batches,
            range = %range,
            fetched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            remaining = self.cursor.remaining(),
            "batch dispatched"
        );

        if self.cursor.is_exhausted() {
            Ok(StepResult::Exhausted)
        } else {
            Ok(StepResult::MoreWork)
        }
    }
}
