mod artifact_expiry;
mod environment_auto_stop;

pub use artifact_expiry::{ARTIFACT_EXPIRY_JOB, ArtifactExpiryBacklog, ArtifactExpiryExecutor};
pub use environment_auto_stop::{
    ENVIRONMENT_AUTO_STOP_JOB, EnvironmentAutoStopBacklog, EnvironmentAutoStopExecutor,
};
