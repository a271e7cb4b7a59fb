use async_trait::async_trait;
use batchline_application::CursorCheckpointStore;
use batchline_core::{AppError, AppResult};
use batchline_domain::JobName;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

/// Redis-backed cursor checkpoints shared by every worker.
#[derive(Clone)]
pub struct RedisCursorCheckpointStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisCursorCheckpointStore {
    /// Creates one checkpoint store adapter.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, job_name: &JobName) -> String {
        format!("{}:{job_name}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Unavailable(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl CursorCheckpointStore for RedisCursorCheckpointStore {
    async fn load(&self, job_name: &JobName) -> AppResult<Option<i64>> {
        let mut connection = self.connection().await?;

        let position: Option<i64> = connection
            .get(self.key_for(job_name))
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to load cursor checkpoint for job '{job_name}': {error}"
                ))
            })?;

        Ok(position)
    }

    async fn save(&self, job_name: &JobName, next_lower_bound: i64) -> AppResult<()> {
        let mut connection = self.connection().await?;

        connection
            .set(self.key_for(job_name), next_lower_bound)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to save cursor checkpoint for job '{job_name}': {error}"
                ))
            })
    }

    async fn clear(&self, job_name: &JobName) -> AppResult<()> {
        let mut connection = self.connection().await?;

        connection
            .del(self.key_for(job_name))
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to clear cursor checkpoint for job '{job_name}': {error}"
                ))
            })
    }
}
