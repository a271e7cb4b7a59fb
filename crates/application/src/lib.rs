//! Application services and ports for bounded batch coordination.

#![forbid(unsafe_code)]

mod batch_coordinator;
mod batch_ports;
mod cursor_strategy;
mod idempotent_dispatcher;
mod lease_manager;
mod loop_governor;
mod maintenance_jobs;
mod maintenance_ports;
mod panic_payload;

#[cfg(test)]
mod test_fakes;

pub use batch_coordinator::{BatchCoordinator, CoordinatorSettings};
pub use batch_ports::{
    BacklogSource, Clock, CursorCheckpointStore, LeaseStore, RunReportSink, WorkItemExecutor,
};
pub use cursor_strategy::CursorStrategy;
pub use idempotent_dispatcher::IdempotentDispatcher;
pub use lease_manager::{LeaseAcquisition, LeaseManager, LeaseScoped};
pub use loop_governor::{LoopGovernor, LoopStep};
pub use maintenance_jobs::{
    ARTIFACT_EXPIRY_JOB, ArtifactExpiryBacklog, ArtifactExpiryExecutor,
    ENVIRONMENT_AUTO_STOP_JOB, EnvironmentAutoStopBacklog, EnvironmentAutoStopExecutor,
};
pub use maintenance_ports::{ArtifactRepository, EnvironmentRepository};
