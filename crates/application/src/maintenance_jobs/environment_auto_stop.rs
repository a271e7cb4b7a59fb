use std::sync::Arc;

use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{EnvironmentStopItem, IdRange};
use tracing::debug;

use crate::batch_ports::{BacklogSource, Clock, WorkItemExecutor};
use crate::maintenance_ports::EnvironmentRepository;

/// Lease key for the environment auto-stop job.
pub const ENVIRONMENT_AUTO_STOP_JOB: &str = "environments_auto_stop";

/// Backlog of available environments whose auto-stop time has passed.
///
/// Bounds are re-selected from the live predicate, so stopped environments
/// drop out of the next invocation on their own.
pub struct EnvironmentAutoStopBacklog {
    repository: Arc<dyn EnvironmentRepository>,
    clock: Arc<dyn Clock>,
}

impl EnvironmentAutoStopBacklog {
    /// Creates the backlog over an environment repository.
    #[must_use]
    pub fn new(repository: Arc<dyn EnvironmentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

#[async_trait]
impl BacklogSource<EnvironmentStopItem> for EnvironmentAutoStopBacklog {
    async fn bounds(&self) -> AppResult<Option<IdRange>> {
        self.repository
            .auto_stoppable_bounds(self.clock.now())
            .await
    }

    async fn fetch(&self, range: IdRange) -> AppResult<Vec<EnvironmentStopItem>> {
        self.repository
            .list_auto_stoppable(range, self.clock.now())
            .await
    }
}

/// Stops one overdue environment; a second delivery is a no-op.
pub struct EnvironmentAutoStopExecutor {
    repository: Arc<dyn EnvironmentRepository>,
}

impl EnvironmentAutoStopExecutor {
    /// Creates the executor over an environment repository.
    #[must_use]
    pub fn new(repository: Arc<dyn EnvironmentRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl WorkItemExecutor<EnvironmentStopItem> for EnvironmentAutoStopExecutor {
    async fn execute(&self, item: &EnvironmentStopItem) -> AppResult<()> {
        let stopped = self
            .repository
            .stop_if_available(item.environment_id)
            .await?;

        if stopped {
            debug!(
                environment_id = item.environment_id,
                project_id = item.project_id,
                environment = %item.name,
                "environment auto-stopped"
            );
        } else {
            debug!(
                environment_id = item.environment_id,
                "environment no longer available, nothing to stop"
            );
        }

        Ok(())
    }
}
