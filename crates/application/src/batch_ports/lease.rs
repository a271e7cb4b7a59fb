use std::time::Duration;

use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{JobName, Lease};

/// Shared store backing distributed job leases.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Atomically creates a lease when no live lease exists for `key`.
    ///
    /// Returns `None` when another holder owns a live lease.
    async fn try_create(
        &self,
        key: &JobName,
        holder_token: &str,
        ttl: Duration,
    ) -> AppResult<Option<Lease>>;

    /// Deletes one lease using token compare-and-delete semantics.
    async fn compare_and_delete(&self, lease: &Lease) -> AppResult<bool>;

    /// Extends one lease and returns `None` when token ownership changed.
    async fn compare_and_renew(&self, lease: &Lease, ttl: Duration) -> AppResult<Option<Lease>>;
}
