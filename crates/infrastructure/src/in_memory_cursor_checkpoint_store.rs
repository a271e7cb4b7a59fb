use std::collections::HashMap;

use async_trait::async_trait;
use batchline_application::CursorCheckpointStore;
use batchline_core::AppResult;
use batchline_domain::JobName;
use tokio::sync::RwLock;

/// Process-local cursor checkpoints; lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCursorCheckpointStore {
    positions: RwLock<HashMap<String, i64>>,
}

impl InMemoryCursorCheckpointStore {
    /// Creates an empty checkpoint store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorCheckpointStore for InMemoryCursorCheckpointStore {
    async fn load(&self, job_name: &JobName) -> AppResult<Option<i64>> {
        Ok(self.positions.read().await.get(job_name.as_str()).copied())
    }

    async fn save(&self, job_name: &JobName, next_lower_bound: i64) -> AppResult<()> {
        self.positions
            .write()
            .await
            .insert(job_name.as_str().to_owned(), next_lower_bound);
        Ok(())
    }

    async fn clear(&self, job_name: &JobName) -> AppResult<()> {
        self.positions.write().await.remove(job_name.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use batchline_application::CursorCheckpointStore;
    use batchline_domain::JobName;

    use super::InMemoryCursorCheckpointStore;

    #[tokio::test]
    async fn checkpoints_are_scoped_per_job() {
        let store = InMemoryCursorCheckpointStore::new();
        let artifacts = JobName::new("ci_job_artifacts_expiry").unwrap_or_else(|_| unreachable!());
        let environments =
            JobName::new("environments_auto_stop").unwrap_or_else(|_| unreachable!());

        assert!(store.save(&artifacts, 500).await.is_ok());
        assert!(matches!(store.load(&artifacts).await, Ok(Some(500))));
        assert!(matches!(store.load(&environments).await, Ok(None)));

        assert!(store.clear(&artifacts).await.is_ok());
        assert!(matches!(store.load(&artifacts).await, Ok(None)));
    }
}
