use serde::{Deserialize, Serialize};

/// Signal returned by one governed loop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// The step made progress and the backlog may hold more work.
    MoreWork,
    /// The backlog is drained.
    Exhausted,
}

/// Terminal state of one governed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernorOutcome {
    /// The iteration allowance was spent with work remaining.
    Completed,
    /// The wall-clock deadline was reached with work remaining.
    TimedOut,
    /// The backlog was drained.
    Exhausted,
}

impl GovernorOutcome {
    /// Returns stable label value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Exhausted => "exhausted",
        }
    }

    /// Returns whether the next trigger should expect leftover work.
    #[must_use]
    pub fn more_work_remains(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }
}

/// Result of executing one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Stable key of the executed item.
    pub item_key: String,
    /// Whether the execution unit finished without error.
    pub succeeded: bool,
    /// Items applied by this unit.
    pub items_processed: u32,
    /// Failure details when the unit did not succeed.
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub fn success(item_key: impl Into<String>) -> Self {
        Self {
            item_key: item_key.into(),
            succeeded: true,
            items_processed: 1,
            error: None,
        }
    }

    /// Builds a failed outcome.
    #[must_use]
    pub fn failure(item_key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            item_key: item_key.into(),
            succeeded: false,
            items_processed: 0,
            error: Some(error.into()),
        }
    }
}

/// Aggregate counts over a set of execution outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Outcomes considered.
    pub dispatched: u64,
    /// Items applied successfully.
    pub succeeded: u64,
    /// Items that failed, timed out or panicked.
    pub failed: u64,
}

impl DispatchSummary {
    /// Summarizes outcomes from one or more dispatches.
    #[must_use]
    pub fn from_outcomes(outcomes: &[ExecutionOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                summary.dispatched += 1;
                if outcome.succeeded {
                    summary.succeeded += u64::from(outcome.items_processed);
                } else {
                    summary.failed += 1;
                }
                summary
            })
    }

    /// Adds another summary into this one.
    pub fn absorb(&mut self, other: Self) {
        self.dispatched += other.dispatched;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}
