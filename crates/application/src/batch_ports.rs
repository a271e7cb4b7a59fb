mod backlog;
mod checkpoint;
mod clock;
mod executor;
mod lease;
mod report;

pub use backlog::BacklogSource;
pub use checkpoint::CursorCheckpointStore;
pub use clock::Clock;
pub use executor::WorkItemExecutor;
pub use lease::LeaseStore;
pub use report::RunReportSink;
