use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use batchline_core::{AppError, AppResult};
use batchline_domain::{JobName, Lease};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::batch_ports::LeaseStore;
use crate::panic_payload::panic_message;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Result of one lease acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseAcquisition {
    /// The caller now holds the lease.
    Acquired(Lease),
    /// Another holder owns the lease, or the store could not be reached.
    Busy,
}

/// Result of running a body under [`LeaseManager::with_lease`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseScoped<T> {
    /// The body ran while holding the lease.
    Ran(T),
    /// The lease was not obtained and the body did not run.
    Busy,
}

/// Distributed mutual exclusion keyed by job name.
///
/// Acquisition fails closed: a store error is reported as [`LeaseAcquisition::Busy`]
/// so no caller ever proceeds without exclusion.
#[derive(Clone)]
pub struct LeaseManager {
    store: Arc<dyn LeaseStore>,
    holder_id: String,
    retry_backoff: Duration,
}

impl LeaseManager {
    /// Creates a lease manager for one holder identity.
    pub fn new(store: Arc<dyn LeaseStore>, holder_id: impl Into<String>) -> AppResult<Self> {
        let holder_id = holder_id.into();
        if holder_id.trim().is_empty() {
            return Err(AppError::Validation(
                "lease holder_id must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            store,
            holder_id,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        })
    }

    /// Overrides the base delay between contended acquisition attempts.
    #[must_use]
    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Returns the holder identity embedded in lease tokens.
    #[must_use]
    pub fn holder_id(&self) -> &str {
        self.holder_id.as_str()
    }

    /// Attempts to acquire the lease for `key`, retrying `max_retries` times
    /// with linear backoff before giving up.
    pub async fn acquire(
        &self,
        key: &JobName,
        ttl: Duration,
        max_retries: u32,
    ) -> LeaseAcquisition {
        if ttl.is_zero() {
            warn!(job_name = %key, "refusing to acquire lease with zero ttl");
            return LeaseAcquisition::Busy;
        }

        let mut attempt = 0_u32;
        loop {
            let holder_token = format!("{}:{}", self.holder_id, uuid::Uuid::new_v4());

            match self.store.try_create(key, holder_token.as_str(), ttl).await {
                Ok(Some(lease)) => {
                    debug!(
                        job_name = %key,
                        attempt,
                        expires_at = %lease.expires_at(),
                        "lease acquired"
                    );
                    return LeaseAcquisition::Acquired(lease);
                }
                Ok(None) => {
                    debug!(job_name = %key, attempt, "lease held by another holder");
                }
                Err(error) => {
                    warn!(
                        job_name = %key,
                        attempt,
                        error = %error,
                        "lease store unavailable, treating lease as busy"
                    );
                }
            }

            if attempt >= max_retries {
                return LeaseAcquisition::Busy;
            }

            attempt += 1;
            tokio::time::sleep(self.retry_backoff.saturating_mul(attempt)).await;
        }
    }

    /// Releases a lease if this holder still owns it.
    ///
    /// Returns `false` when the lease already expired and may belong to
    /// someone else; nothing is deleted in that case.
    pub async fn release(&self, lease: &Lease) -> AppResult<bool> {
        let released = self.store.compare_and_delete(lease).await?;
        if !released {
            warn!(
                job_name = %lease.key(),
                "lease was no longer owned at release time"
            );
        }

        Ok(released)
    }

    /// Extends a held lease; returns `None` when ownership moved elsewhere.
    pub async fn renew(&self, lease: &Lease, ttl: Duration) -> AppResult<Option<Lease>> {
        if ttl.is_zero() {
            return Err(AppError::Validation(
                "lease ttl must be greater than zero".to_owned(),
            ));
        }

        self.store.compare_and_renew(lease, ttl).await
    }

    /// Runs `body` while holding the lease for `key`.
    ///
    /// The lease is released on every exit path of `body`, including errors
    /// and panics; a panic is reported as [`AppError::Internal`].
    pub async fn with_lease<T, F, Fut>(
        &self,
        key: &JobName,
        ttl: Duration,
        max_retries: u32,
        body: F,
    ) -> AppResult<LeaseScoped<T>>
    where
        F: FnOnce(Lease) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let lease = match self.acquire(key, ttl, max_retries).await {
            LeaseAcquisition::Acquired(lease) => lease,
            LeaseAcquisition::Busy => return Ok(LeaseScoped::Busy),
        };

        let scoped_lease = lease.clone();
        let result = AssertUnwindSafe(async move { body(scoped_lease).await })
            .catch_unwind()
            .await;

        if let Err(error) = self.release(&lease).await {
            warn!(
                job_name = %key,
                error = %error,
                "failed to release lease, it will expire after its ttl"
            );
        }

        match result {
            Ok(outcome) => outcome.map(LeaseScoped::Ran),
            Err(payload) => Err(AppError::Internal(format!(
                "lease body for '{key}' panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}
