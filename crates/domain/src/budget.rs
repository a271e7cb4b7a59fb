use std::time::Duration;

use batchline_core::{AppError, AppResult};
use chrono::{DateTime, Utc};

/// Wall-clock and iteration allowance for one coordinator invocation.
///
/// The deadline is absolute: it is fixed when the budget is created and slow
/// iterations never push it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopBudget {
    deadline: DateTime<Utc>,
    max_iterations: u32,
    iterations_done: u32,
}

impl LoopBudget {
    /// Creates a budget whose deadline is `started_at + timeout`.
    pub fn starting_at(
        started_at: DateTime<Utc>,
        timeout: Duration,
        max_iterations: u32,
    ) -> AppResult<Self> {
        let timeout = chrono::Duration::from_std(timeout).map_err(|error| {
            AppError::Validation(format!("loop timeout is out of range: {error}"))
        })?;
        let deadline = started_at.checked_add_signed(timeout).ok_or_else(|| {
            AppError::Validation("loop deadline overflows the supported time range".to_owned())
        })?;

        Self::with_deadline(deadline, max_iterations)
    }

    /// Creates a budget with an explicit deadline.
    pub fn with_deadline(deadline: DateTime<Utc>, max_iterations: u32) -> AppResult<Self> {
        if max_iterations == 0 {
            return Err(AppError::Validation(
                "loop max_iterations must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            deadline,
            max_iterations,
            iterations_done: 0,
        })
    }

    /// Returns the absolute deadline.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns the iteration cap.
    #[must_use]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Returns how many iterations have started.
    #[must_use]
    pub fn iterations_done(&self) -> u32 {
        self.iterations_done
    }

    /// Returns whether the deadline has been reached at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// Returns whether the iteration cap has been reached.
    #[must_use]
    pub fn iterations_exhausted(&self) -> bool {
        self.iterations_done >= self.max_iterations
    }

    /// Returns the time left until the deadline, saturating at zero.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Counts one started iteration.
    pub fn record_iteration(&mut self) {
        self.iterations_done = self.iterations_done.saturating_add(1);
    }
}
