use std::sync::Arc;

use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{ExpiredArtifactItem, IdRange};
use tracing::debug;

use crate::batch_ports::{BacklogSource, Clock, WorkItemExecutor};
use crate::maintenance_ports::ArtifactRepository;

/// Lease key for the build artifact expiry job.
pub const ARTIFACT_EXPIRY_JOB: &str = "ci_job_artifacts_expiry";

/// Backlog of unlocked build artifacts past their expiry instant.
pub struct ArtifactExpiryBacklog {
    repository: Arc<dyn ArtifactRepository>,
    clock: Arc<dyn Clock>,
}

impl ArtifactExpiryBacklog {
    /// Creates the backlog over an artifact repository.
    #[must_use]
    pub fn new(repository: Arc<dyn ArtifactRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

#[async_trait]
impl BacklogSource<ExpiredArtifactItem> for ArtifactExpiryBacklog {
    async fn bounds(&self) -> AppResult<Option<IdRange>> {
        self.repository.expired_bounds(self.clock.now()).await
    }

    async fn fetch(&self, range: IdRange) -> AppResult<Vec<ExpiredArtifactItem>> {
        self.repository.list_expired(range, self.clock.now()).await
    }
}

/// Deletes one expired artifact; the delete re-checks expiry and lock state.
pub struct ArtifactExpiryExecutor {
    repository: Arc<dyn ArtifactRepository>,
    clock: Arc<dyn Clock>,
}

impl ArtifactExpiryExecutor {
    /// Creates the executor over an artifact repository.
    #[must_use]
    pub fn new(repository: Arc<dyn ArtifactRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

#[async_trait]
impl WorkItemExecutor<ExpiredArtifactItem> for ArtifactExpiryExecutor {
    async fn execute(&self, item: &ExpiredArtifactItem) -> AppResult<()> {
        let destroyed = self
            .repository
            .destroy_if_expired(item.artifact_id, self.clock.now())
            .await?;

        if destroyed {
            debug!(
                artifact_id = item.artifact_id,
                job_id = item.job_id,
                size_bytes = item.size_bytes,
                "expired artifact destroyed"
            );
        } else {
            debug!(
                artifact_id = item.artifact_id,
                "artifact already gone or locked, nothing to destroy"
            );
        }

        Ok(())
    }
}
