use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batchline_application::{Clock, LeaseStore};
use batchline_core::{AppError, AppResult};
use batchline_domain::{JobName, Lease};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Process-local lease store for single-node deployments and tests.
///
/// Expiry follows the injected clock, so a lease left behind by a crashed
/// holder becomes acquirable once its ttl has passed.
pub struct InMemoryLeaseStore {
    clock: Arc<dyn Clock>,
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLeaseStore {
    /// Creates an empty lease store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            leases: Mutex::new(HashMap::new()),
        }
    }

    fn expiry_after(&self, ttl: Duration) -> AppResult<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|error| AppError::Validation(format!("lease ttl is out of range: {error}")))?;

        self.clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Validation("lease expiry overflows".to_owned()))
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn try_create(
        &self,
        key: &JobName,
        holder_token: &str,
        ttl: Duration,
    ) -> AppResult<Option<Lease>> {
        let expires_at = self.expiry_after(ttl)?;
        let mut leases = self.leases.lock().await;

        let now = self.clock.now();
        if leases
            .get(key.as_str())
            .is_some_and(|lease| lease.is_live_at(now))
        {
            return Ok(None);
        }

        let lease = Lease::new(key.clone(), holder_token, expires_at)?;
        leases.insert(key.as_str().to_owned(), lease.clone());
        Ok(Some(lease))
    }

    async fn compare_and_delete(&self, lease: &Lease) -> AppResult<bool> {
        let mut leases = self.leases.lock().await;
        let owned = leases
            .get(lease.key().as_str())
            .is_some_and(|stored| stored.holder_token() == lease.holder_token());
        if owned {
            leases.remove(lease.key().as_str());
        }

        Ok(owned)
    }

    async fn compare_and_renew(&self, lease: &Lease, ttl: Duration) -> AppResult<Option<Lease>> {
        let expires_at = self.expiry_after(ttl)?;
        let now = self.clock.now();
        let mut leases = self.leases.lock().await;

        match leases.get_mut(lease.key().as_str()) {
            Some(stored)
                if stored.holder_token() == lease.holder_token() && stored.is_live_at(now) =>
            {
                *stored = stored.with_expiry(expires_at);
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }
}
