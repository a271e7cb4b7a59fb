//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_run_report_sink;
mod in_memory_cursor_checkpoint_store;
mod in_memory_lease_store;
mod postgres_artifact_repository;
mod postgres_environment_repository;
mod postgres_lease_store;
mod redis_cursor_checkpoint_store;
mod redis_lease_store;
mod system_clock;

pub use http_run_report_sink::HttpRunReportSink;
pub use in_memory_cursor_checkpoint_store::InMemoryCursorCheckpointStore;
pub use in_memory_lease_store::InMemoryLeaseStore;
pub use postgres_artifact_repository::PostgresArtifactRepository;
pub use postgres_environment_repository::PostgresEnvironmentRepository;
pub use postgres_lease_store::PostgresLeaseStore;
pub use redis_cursor_checkpoint_store::RedisCursorCheckpointStore;
pub use redis_lease_store::RedisLeaseStore;
pub use system_clock::SystemClock;
