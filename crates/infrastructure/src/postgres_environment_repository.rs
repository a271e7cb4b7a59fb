use async_trait::async_trait;
use batchline_application::EnvironmentRepository;
use batchline_core::{AppError, AppResult};
use batchline_domain::{EnvironmentState, EnvironmentStopItem, IdRange};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed environment repository.
#[derive(Clone)]
pub struct PostgresEnvironmentRepository {
    pool: PgPool,
}

impl PostgresEnvironmentRepository {
    /// Creates an environment repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EnvironmentStopRow {
    id: i64,
    project_id: i64,
    name: String,
    auto_stop_at: DateTime<Utc>,
}

impl From<EnvironmentStopRow> for EnvironmentStopItem {
    fn from(row: EnvironmentStopRow) -> Self {
        Self {
            environment_id: row.id,
            project_id: row.project_id,
            name: row.name,
            auto_stop_at: row.auto_stop_at,
        }
    }
}

#[async_trait]
impl EnvironmentRepository for PostgresEnvironmentRepository {
    async fn auto_stoppable_bounds(&self, now: DateTime<Utc>) -> AppResult<Option<IdRange>> {
        let (first, last) = sqlx::query_as::<_, (Option<i64>, Option<i64>)>(
            r#"
            SELECT MIN(id), MAX(id)
            FROM environments
            WHERE state = $1
              AND auto_stop_at <= $2
            "#,
        )
        .bind(EnvironmentState::Available.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to derive auto-stoppable environment bounds: {error}"
            ))
        })?;

        match (first, last) {
            (Some(first), Some(last)) => IdRange::covering(first, last).map(Some),
            _ => Ok(None),
        }
    }

    async fn list_auto_stoppable(
        &self,
        range: IdRange,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<EnvironmentStopItem>> {
        let rows = sqlx::query_as::<_, EnvironmentStopRow>(
            r#"
            SELECT id, project_id, name, auto_stop_at
            FROM environments
            WHERE id >= $1
              AND id < $2
              AND state = $3
              AND auto_stop_at <= $4
            ORDER BY id ASC
            "#,
        )
        .bind(range.start())
        .bind(range.end())
        .bind(EnvironmentState::Available.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list auto-stoppable environments in {range}: {error}"
            ))
        })?;

        Ok(rows.into_iter().map(EnvironmentStopItem::from).collect())
    }

    async fn stop_if_available(&self, environment_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE environments
            SET state = $2,
                updated_at = now()
            WHERE id = $1
              AND state = $3
            "#,
        )
        .bind(environment_id)
        .bind(EnvironmentState::Stopped.as_str())
        .bind(EnvironmentState::Available.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to stop environment '{environment_id}': {error}"
            ))
        })?;

        Ok(result.rows_affected() == 1)
    }
}
