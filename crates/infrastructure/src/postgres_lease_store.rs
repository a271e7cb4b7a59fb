use std::time::Duration;

use async_trait::async_trait;
use batchline_application::LeaseStore;
use batchline_core::{AppError, AppResult};
use batchline_domain::{JobName, Lease};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// PostgreSQL-backed lease store.
///
/// Expiry is judged by the database clock, so holders on skewed hosts still
/// agree on when a lease ends.
#[derive(Clone)]
pub struct PostgresLeaseStore {
    pool: PgPool,
}

impl PostgresLeaseStore {
    /// Creates a lease store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ttl_millis(ttl: Duration) -> AppResult<i64> {
    i64::try_from(ttl.as_millis())
        .map_err(|error| AppError::Validation(format!("lease ttl is out of range: {error}")))
}

#[async_trait]
impl LeaseStore for PostgresLeaseStore {
    async fn try_create(
        &self,
        key: &JobName,
        holder_token: &str,
        ttl: Duration,
    ) -> AppResult<Option<Lease>> {
        let expires_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO job_leases (lease_key, holder_token, acquired_at, expires_at)
            VALUES ($1, $2, now(), now() + ($3::BIGINT * INTERVAL '1 millisecond'))
            ON CONFLICT (lease_key)
            DO UPDATE SET
                holder_token = EXCLUDED.holder_token,
                acquired_at = EXCLUDED.acquired_at,
                expires_at = EXCLUDED.expires_at
            WHERE job_leases.expires_at <= now()
            RETURNING expires_at
            "#,
        )
        .bind(key.as_str())
        .bind(holder_token)
        .bind(ttl_millis(ttl)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Unavailable(format!("failed to acquire lease for job '{key}': {error}"))
        })?;

        expires_at
            .map(|expires_at| Lease::new(key.clone(), holder_token, expires_at))
            .transpose()
    }

    async fn compare_and_delete(&self, lease: &Lease) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM job_leases
            WHERE lease_key = $1
              AND holder_token = $2
            "#,
        )
        .bind(lease.key().as_str())
        .bind(lease.holder_token())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to release lease for job '{}': {error}",
                lease.key()
            ))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_renew(&self, lease: &Lease, ttl: Duration) -> AppResult<Option<Lease>> {
        let expires_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE job_leases
            SET expires_at = now() + ($3::BIGINT * INTERVAL '1 millisecond')
            WHERE lease_key = $1
              AND holder_token = $2
              AND expires_at > now()
            RETURNING expires_at
            "#,
        )
        .bind(lease.key().as_str())
        .bind(lease.holder_token())
        .bind(ttl_millis(ttl)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to renew lease for job '{}': {error}",
                lease.key()
            ))
        })?;

        Ok(expires_at.map(|expires_at| lease.with_expiry(expires_at)))
    }
}
