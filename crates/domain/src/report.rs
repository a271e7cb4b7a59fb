use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::GovernorOutcome;

/// Coordinator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// Not running.
    Idle,
    /// Waiting on the lease store.
    Acquiring,
    /// Holding the lease and running the governed loop.
    Running,
    /// Giving the lease back.
    Releasing,
}

impl CoordinatorState {
    /// Returns stable label value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Running => "running",
            Self::Releasing => "releasing",
        }
    }

    /// Returns whether moving to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Acquiring)
                | (Self::Acquiring, Self::Running)
                | (Self::Acquiring, Self::Idle)
                | (Self::Running, Self::Releasing)
                | (Self::Releasing, Self::Idle)
        )
    }
}

/// Invocation-level outcome published to observability sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Iteration allowance spent; work remains.
    Completed,
    /// Deadline reached; work remains.
    TimedOut,
    /// Backlog drained.
    Exhausted,
    /// Another holder owns the lease, or the lease store was unreachable.
    Busy,
    /// A store-level failure aborted the invocation.
    Failed,
}

impl RunOutcome {
    /// Returns stable label value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Exhausted => "exhausted",
            Self::Busy => "busy",
            Self::Failed => "failed",
        }
    }
}

impl From<GovernorOutcome> for RunOutcome {
    fn from(value: GovernorOutcome) -> Self {
        match value {
            GovernorOutcome::Completed => Self::Completed,
            GovernorOutcome::TimedOut => Self::TimedOut,
            GovernorOutcome::Exhausted => Self::Exhausted,
        }
    }
}

/// Summary of one coordinator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Job name the invocation ran for.
    pub job_name: String,
    /// Invocation outcome.
    pub outcome: RunOutcome,
    /// Items applied successfully.
    pub items_processed: u64,
    /// Items that failed, timed out or panicked.
    pub failed_items: u64,
    /// Governed loop iterations started.
    pub iterations: u32,
    /// Invocation start timestamp.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Store-level failure details for [`RunOutcome::Failed`].
    pub error: Option<String>,
    /// State transitions observed during the invocation.
    #[serde(skip)]
    pub transitions: Vec<CoordinatorState>,
}
