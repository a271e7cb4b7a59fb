//! Domain entities and invariants for bounded batch coordination.

#![forbid(unsafe_code)]

mod budget;
mod cursor;
mod environment;
mod job;
mod lease;
mod outcome;
mod report;
mod work_item;

pub use budget::LoopBudget;
pub use cursor::{BatchCursor, IdRange};
pub use environment::{EnvironmentState, EnvironmentStopItem, ExpiredArtifactItem};
pub use job::JobName;
pub use lease::Lease;
pub use outcome::{DispatchSummary, ExecutionOutcome, GovernorOutcome, StepResult};
pub use report::{CoordinatorState, RunOutcome, RunReport};
pub use work_item::WorkItem;
