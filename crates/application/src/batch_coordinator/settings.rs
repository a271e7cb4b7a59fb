use std::time::Duration;

use batchline_core::{AppError, AppResult};

/// Tuning for one batch coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Maximum ids per cursor batch.
    pub batch_size: u32,
    /// Wall-clock allowance per invocation, measured from its start.
    pub timeout: Duration,
    /// Iteration cap per invocation.
    pub max_iterations: u32,
    /// Lease time-to-live; bounds unavailability after a crashed holder.
    pub lease_ttl: Duration,
    /// Extra acquisition attempts before reporting busy.
    pub lease_max_retries: u32,
    /// Release the lease when the run ends instead of letting it expire.
    ///
    /// Keeping it turns the lease into a minimum interval between runs.
    pub release_lease_on_exit: bool,
    /// Extend the lease after every dispatched batch.
    ///
    /// When disabled the lease must outlive the whole run.
    pub renew_lease_each_batch: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            timeout: Duration::from_secs(4 * 60),
            max_iterations: 1_000,
            lease_ttl: Duration::from_secs(50 * 60),
            lease_max_retries: 0,
            release_lease_on_exit: true,
            renew_lease_each_batch: true,
        }
    }
}

impl CoordinatorSettings {
    /// Checks settings invariants.
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::Validation(
                "batch_size must be greater than zero".to_owned(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(AppError::Validation(
                "timeout must be greater than zero".to_owned(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(AppError::Validation(
                "max_iterations must be greater than zero".to_owned(),
            ));
        }

        if self.lease_ttl.is_zero() {
            return Err(AppError::Validation(
                "lease_ttl must be greater than zero".to_owned(),
            ));
        }

        if self.lease_ttl <= self.timeout {
            return Err(AppError::Validation(format!(
                "lease_ttl ({}s) must exceed timeout ({}s)",
                self.lease_ttl.as_secs(),
                self.timeout.as_secs()
            )));
        }

        Ok(())
    }

    /// Checks that the lease outlives the slowest batch a dispatcher can run.
    ///
    /// A batch takes at most `item_timeout` per wave of `concurrency` items.
    /// Without renewal the lease must also cover the full run, since the
    /// deadline is only checked between batches.
    pub(crate) fn validate_batch_window(
        &self,
        concurrency: usize,
        item_timeout: Duration,
    ) -> AppResult<()> {
        let concurrency = u32::try_from(concurrency).unwrap_or(u32::MAX).max(1);
        let slowest_batch = item_timeout.saturating_mul(self.batch_size.div_ceil(concurrency));
        let required = if self.renew_lease_each_batch {
            slowest_batch
        } else {
            self.timeout.saturating_add(slowest_batch)
        };

        if self.lease_ttl <= required {
            return Err(AppError::Validation(format!(
                "lease_ttl ({}s) must exceed {}s to cover a batch of {} items at concurrency {} \
                 with {}s item timeout",
                self.lease_ttl.as_secs(),
                required.as_secs(),
                self.batch_size,
                concurrency,
                item_timeout.as_secs()
            )));
        }

        Ok(())
    }
}
