use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{IdRange, WorkItem};

/// Range-queryable durable backlog of work items.
#[async_trait]
pub trait BacklogSource<I: WorkItem>: Send + Sync {
    /// Returns the id range currently covering eligible items, or `None` when
    /// nothing is eligible.
    async fn bounds(&self) -> AppResult<Option<IdRange>>;

    /// Returns eligible items whose ids fall inside `range`, ordered by id.
    ///
    /// Items deleted since `bounds` was read simply do not appear.
    async fn fetch(&self, range: IdRange) -> AppResult<Vec<I>>;
}
