use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::WorkItem;

/// Isolated execution unit for one work item.
///
/// Implementations must be idempotent: either naturally convergent or
/// checking current state before acting.
#[async_trait]
pub trait WorkItemExecutor<I: WorkItem>: Send + Sync {
    /// Applies one item.
    async fn execute(&self, item: &I) -> AppResult<()>;
}
