use std::fmt::{Display, Formatter};

use batchline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` range over backlog ordering keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdRange {
    start: i64,
    end: i64,
}

impl IdRange {
    /// Creates a validated range.
    pub fn new(start: i64, end: i64) -> AppResult<Self> {
        if start > end {
            return Err(AppError::Validation(format!(
                "range start {start} must not exceed range end {end}"
            )));
        }

        Ok(Self { start, end })
    }

    /// Creates the smallest range covering the inclusive ids `first..=last`.
    pub fn covering(first: i64, last: i64) -> AppResult<Self> {
        let end = last.checked_add(1).ok_or_else(|| {
            AppError::Validation(format!("range end overflows after id {last}"))
        })?;

        Self::new(first, end)
    }

    /// Returns the inclusive lower bound.
    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Returns the exclusive upper bound.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Returns whether the range covers no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns the number of ids in the range.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    /// Returns whether `id` falls inside the range.
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.start <= id && id < self.end
    }
}

impl Display for IdRange {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "[{}, {})", self.start, self.end)
    }
}

/// Progress marker yielding successive bounded batches over an [`IdRange`].
///
/// Ranges come out strictly increasing and never overlap; once the cursor is
/// exhausted their union equals the range it was opened over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCursor {
    lower_bound: i64,
    upper_bound: i64,
    batch_size: u32,
}

impl BatchCursor {
    /// Opens a cursor over `range` with a default batch width.
    pub fn new(range: IdRange, batch_size: u32) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::Validation(
                "cursor batch_size must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            lower_bound: range.start(),
            upper_bound: range.end(),
            batch_size,
        })
    }

    /// Returns the next batch using the cursor's configured width.
    pub fn next_batch(&mut self) -> Option<IdRange> {
        self.next_batch_of(self.batch_size)
    }

    /// Returns the next batch of width at most `size`, or `None` once exhausted.
    pub fn next_batch_of(&mut self, size: u32) -> Option<IdRange> {
        if self.is_exhausted() || size == 0 {
            return None;
        }

        let start = self.lower_bound;
        let end = start
            .saturating_add(i64::from(size))
            .min(self.upper_bound);
        self.lower_bound = end;

        Some(IdRange { start, end })
    }

    /// Returns whether every id in the range has been handed out.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.lower_bound >= self.upper_bound
    }

    /// Returns the number of ids not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        if self.is_exhausted() {
            0
        } else {
            self.upper_bound.abs_diff(self.lower_bound)
        }
    }

    /// Returns the first id not yet handed out.
    #[must_use]
    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }

    /// Returns the exclusive end of the cursor range.
    #[must_use]
    pub fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    /// Returns the configured batch width.
    #[must_use]
    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }
}
