use std::sync::Arc;

use batchline_core::AppResult;
use batchline_domain::{BatchCursor, IdRange, JobName};

use crate::batch_ports::CursorCheckpointStore;

/// How a coordinator positions its cursor at the start of an invocation.
#[derive(Clone, Default)]
pub enum CursorStrategy {
    /// Start from the live backlog bounds every invocation.
    ///
    /// Suits backlogs whose selection predicate drops processed rows, so
    /// leftovers are re-selected naturally.
    #[default]
    Rederived,
    /// Resume from a lower bound persisted after each confirmed batch.
    Checkpointed(Arc<dyn CursorCheckpointStore>),
}

impl CursorStrategy {
    /// Returns stable label value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rederived => "rederived",
            Self::Checkpointed(_) => "checkpointed",
        }
    }

    pub(crate) async fn open(
        &self,
        job_name: &JobName,
        bounds: IdRange,
        batch_size: u32,
    ) -> AppResult<BatchCursor> {
        let start = match self {
            Self::Rederived => bounds.start(),
            Self::Checkpointed(store) => store
                .load(job_name)
                .await?
                .map_or(bounds.start(), |position| {
                    position.clamp(bounds.start(), bounds.end())
                }),
        };

        BatchCursor::new(IdRange::new(start, bounds.end())?, batch_size)
    }

    /// Records that every id below `batch.end()` has been dispatched.
    pub(crate) async fn commit(&self, job_name: &JobName, batch: IdRange) -> AppResult<()> {
        match self {
            Self::Rederived => Ok(()),
            Self::Checkpointed(store) => store.save(job_name, batch.end()).await,
        }
    }

    /// Forgets the persisted position once the backlog is drained.
    pub(crate) async fn finish(&self, job_name: &JobName) -> AppResult<()> {
        match self {
            Self::Rederived => Ok(()),
            Self::Checkpointed(store) => store.clear(job_name).await,
        }
    }
}
