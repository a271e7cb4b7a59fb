//! Redis-backed distributed lease store for batch coordinators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batchline_application::{Clock, LeaseStore};
use batchline_core::{AppError, AppResult};
use batchline_domain::{JobName, Lease};
use chrono::{DateTime, Utc};
use redis::Script;
use redis::aio::MultiplexedConnection;

const RELEASE_LEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
else
  return 0
end
"#;

const RENEW_LEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('PEXPIRE', KEYS[1], ARGV[2])
else
  return 0
end
"#;

/// Redis implementation of the lease store.
///
/// Creation is a single `SET NX PX`, so a lease can never exist without a ttl.
#[derive(Clone)]
pub struct RedisLeaseStore {
    client: redis::Client,
    key_prefix: String,
    clock: Arc<dyn Clock>,
}

impl RedisLeaseStore {
    /// Creates one lease store adapter.
    #[must_use]
    pub fn new(
        client: redis::Client,
        key_prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            clock,
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

    fn expiry_after(&self, ttl: Duration) -> AppResult<(u64, DateTime<Utc>)> {
        let ttl_ms = u64::try_from(ttl.as_millis()).map_err(|error| {
            AppError::Validation(format!("lease ttl is out of range: {error}"))
        })?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|error| AppError::Validation(format!("lease ttl is out of range: {error}")))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Validation("lease expiry overflows".to_owned()))?;

        Ok((ttl_ms, expires_at))
    }
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
    async fn try_create(
        &self,
        key: &JobName,
        holder_token: &str,
        ttl: Duration,
    ) -> AppResult<Option<Lease>> {
        let (ttl_ms, expires_at) = self.expiry_after(ttl)?;
        let mut connection = self.connection().await?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key_for(key))
            .arg(holder_token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to acquire lease for job '{key}': {error}"))
            })?;

        if reply.is_none() {
            return Ok(None);
        }

        Lease::new(key.clone(), holder_token, expires_at).map(Some)
    }

    async fn compare_and_delete(&self, lease: &Lease) -> AppResult<bool> {
        let mut connection = self.connection().await?;

        let deleted = Script::new(RELEASE_LEASE_SCRIPT)
            .key(self.key_for(lease.key()))
            .arg(lease.holder_token())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to release lease for job '{}': {error}",
                    lease.key()
                ))
            })?;

        Ok(deleted > 0)
    }

    async fn compare_and_renew(&self, lease: &Lease, ttl: Duration) -> AppResult<Option<Lease>> {
        let (ttl_ms, expires_at) = self.expiry_after(ttl)?;
        let mut connection = self.connection().await?;

        let renewed = Script::new(RENEW_LEASE_SCRIPT)
            .key(self.key_for(lease.key()))
            .arg(lease.holder_token())
            .arg(ttl_ms)
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to renew lease for job '{}': {error}",
                    lease.key()
                ))
            })?;

        Ok((renewed > 0).then(|| lease.with_expiry(expires_at)))
    }
}
