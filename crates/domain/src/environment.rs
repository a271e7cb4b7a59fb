use batchline_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::WorkItem;

/// Lifecycle state of a deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentState {
    /// Environment is running and may be auto-stopped.
    Available,
    /// A stop was requested and is in progress.
    Stopping,
    /// Environment is stopped.
    Stopped,
}

impl EnvironmentState {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "available" => Ok(Self::Available),
            "stopping" => Ok(Self::Stopping),
            "stopped" => Ok(Self::Stopped),
            _ => Err(AppError::Validation(format!(
                "unknown environment state '{value}'"
            ))),
        }
    }
}

/// Environment whose auto-stop time has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentStopItem {
    /// Environment primary key.
    pub environment_id: i64,
    /// Owning project primary key.
    pub project_id: i64,
    /// Environment name.
    pub name: String,
    /// Scheduled auto-stop instant.
    pub auto_stop_at: DateTime<Utc>,
}

impl WorkItem for EnvironmentStopItem {
    fn item_key(&self) -> String {
        format!("environment:{}", self.environment_id)
    }
}

/// Build artifact whose retention window has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredArtifactItem {
    /// Artifact primary key.
    pub artifact_id: i64,
    /// Build job that produced the artifact.
    pub job_id: i64,
    /// Stored file size in bytes.
    pub size_bytes: i64,
    /// Expiry instant.
    pub expire_at: DateTime<Utc>,
}

impl WorkItem for ExpiredArtifactItem {
    fn item_key(&self) -> String {
        format!("artifact:{}", self.artifact_id)
    }
}
