use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use batchline_core::{AppError, AppResult};
use batchline_domain::{ExecutionOutcome, WorkItem};
use futures::{FutureExt, StreamExt, stream};
use tracing::{debug, warn};

use crate::batch_ports::WorkItemExecutor;
use crate::panic_payload::panic_message;

/// Fans a batch out to per-item executions with bounded concurrency.
///
/// Executions must be idempotent: a batch may be delivered again after a
/// timeout or crash, and the dispatcher itself never retries.
pub struct IdempotentDispatcher<I: WorkItem> {
    executor: Arc<dyn WorkItemExecutor<I>>,
    concurrency: usize,
    item_timeout: Duration,
}

impl<I: WorkItem> IdempotentDispatcher<I> {
    /// Creates a dispatcher running at most `concurrency` items at a time.
    pub fn new(
        executor: Arc<dyn WorkItemExecutor<I>>,
        concurrency: usize,
        item_timeout: Duration,
    ) -> AppResult<Self> {
        if concurrency == 0 {
            return Err(AppError::Validation(
                "dispatcher concurrency must be greater than zero".to_owned(),
            ));
        }

        if item_timeout.is_zero() {
            return Err(AppError::Validation(
                "dispatcher item_timeout must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            executor,
            concurrency,
            item_timeout,
        })
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the per-item timeout.
    #[must_use]
    pub fn item_timeout(&self) -> Duration {
        self.item_timeout
    }

    /// Executes every distinct item and returns one outcome per item, in
    /// input order.
    ///
    /// Items sharing an `item_key` run once. Failures, timeouts and panics
    /// become failed outcomes; this never returns an error.
    pub async fn dispatch(&self, items: Vec<I>) -> Vec<ExecutionOutcome> {
        let mut seen = HashSet::with_capacity(items.len());
        let mut unique = Vec::with_capacity(items.len());
        for item in items {
            let item_key = item.item_key();
            if seen.insert(item_key.clone()) {
                unique.push((item_key, item));
            } else {
                debug!(item_key = %item_key, "skipping duplicate work item in batch");
            }
        }

        stream::iter(unique)
            .map(|(item_key, item)| self.execute_one(item_key, item))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn execute_one(&self, item_key: String, item: I) -> ExecutionOutcome {
        let execution = AssertUnwindSafe(self.executor.execute(&item)).catch_unwind();

        match tokio::time::timeout(self.item_timeout, execution).await {
            Ok(Ok(Ok(()))) => ExecutionOutcome::success(item_key),
            Ok(Ok(Err(error))) => {
                warn!(item_key = %item_key, error = %error, "work item failed");
                ExecutionOutcome::failure(item_key, error.to_string())
            }
            Ok(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                warn!(item_key = %item_key, panic = %message, "work item panicked");
                ExecutionOutcome::failure(item_key, format!("work item panicked: {message}"))
            }
            Err(_) => {
                let timeout_ms = u64::try_from(self.item_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(item_key = %item_key, timeout_ms, "work item timed out");
                ExecutionOutcome::failure(
                    item_key,
                    format!("work item timed out after {timeout_ms}ms"),
                )
            }
        }
    }
}
