use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{ExpiredArtifactItem, IdRange};
use chrono::{DateTime, Utc};

/// Repository port for build artifacts past their retention window.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Returns the id range covering expired, unlocked artifacts.
    async fn expired_bounds(&self, now: DateTime<Utc>) -> AppResult<Option<IdRange>>;

    /// Lists expired, unlocked artifacts inside one id range.
    async fn list_expired(
        &self,
        range: IdRange,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ExpiredArtifactItem>>;

    /// Deletes one artifact if it is still expired and unlocked; returns whether a row went away.
    async fn destroy_if_expired(&self, artifact_id: i64, now: DateTime<Utc>) -> AppResult<bool>;
}
