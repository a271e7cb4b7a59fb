use async_trait::async_trait;
use batchline_application::ArtifactRepository;
use batchline_core::{AppError, AppResult};
use batchline_domain::{ExpiredArtifactItem, IdRange};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed build artifact repository.
#[derive(Clone)]
pub struct PostgresArtifactRepository {
    pool: PgPool,
}

impl PostgresArtifactRepository {
    /// Creates an artifact repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ExpiredArtifactRow {
    id: i64,
    job_id: i64,
    size_bytes: i64,
    expire_at: DateTime<Utc>,
}

impl From<ExpiredArtifactRow> for ExpiredArtifactItem {
    fn from(row: ExpiredArtifactRow) -> Self {
        Self {
            artifact_id: row.id,
            job_id: row.job_id,
            size_bytes: row.size_bytes,
            expire_at: row.expire_at,
        }
    }
}

#[async_trait]
impl ArtifactRepository for PostgresArtifactRepository {
    async fn expired_bounds(&self, now: DateTime<Utc>) -> AppResult<Option<IdRange>> {
        let (first, last) = sqlx::query_as::<_, (Option<i64>, Option<i64>)>(
            r#"
            SELECT MIN(id), MAX(id)
            FROM ci_job_artifacts
            WHERE locked = FALSE
              AND expire_at <= $1
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to derive expired artifact bounds: {error}"))
        })?;

        match (first, last) {
            (Some(first), Some(last)) => IdRange::covering(first, last).map(Some),
            _ => Ok(None),
        }
    }

    async fn list_expired(
        &self,
        range: IdRange,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ExpiredArtifactItem>> {
        let rows = sqlx::query_as::<_, ExpiredArtifactRow>(
            r#"
            SELECT id, job_id, size_bytes, expire_at
            FROM ci_job_artifacts
            WHERE id >= $1
              AND id < $2
              AND locked = FALSE
              AND expire_at <= $3
            ORDER BY id ASC
            "#,
        )
        .bind(range.start())
        .bind(range.end())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list expired artifacts in {range}: {error}"
            ))
        })?;

        Ok(rows.into_iter().map(ExpiredArtifactItem::from).collect())
    }

    async fn destroy_if_expired(&self, artifact_id: i64, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM ci_job_artifacts
            WHERE id = $1
              AND locked = FALSE
              AND expire_at <= $2
            "#,
        )
        .bind(artifact_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to destroy artifact '{artifact_id}': {error}"
            ))
        })?;

        Ok(result.rows_affected() == 1)
    }
}
