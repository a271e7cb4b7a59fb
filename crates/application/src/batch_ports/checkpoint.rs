use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::JobName;

/// Durable store for cursor progress that must survive between invocations.
#[async_trait]
pub trait CursorCheckpointStore: Send + Sync {
    /// Returns the first unprocessed id recorded for one job.
    async fn load(&self, job_name: &JobName) -> AppResult<Option<i64>>;

    /// Records the first unprocessed id after a confirmed batch.
    async fn save(&self, job_name: &JobName, next_lower_bound: i64) -> AppResult<()>;

    /// Drops recorded progress once the backlog is drained.
    async fn clear(&self, job_name: &JobName) -> AppResult<()>;
}
