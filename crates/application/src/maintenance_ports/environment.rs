use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{EnvironmentStopItem, IdRange};
use chrono::{DateTime, Utc};

/// Repository port for environments that stop themselves after a deadline.
#[async_trait]
pub trait EnvironmentRepository: Send + Sync {
    /// Returns the id range covering environments overdue for auto-stop.
    async fn auto_stoppable_bounds(&self, now: DateTime<Utc>) -> AppResult<Option<IdRange>>;

    /// Lists overdue, still-available environments inside one id range.
    async fn list_auto_stoppable(
        &self,
        range: IdRange,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<EnvironmentStopItem>>;

    /// Stops one environment if it is still available and returns whether it changed.
    async fn stop_if_available(&self, environment_id: i64) -> AppResult<bool>;
}
