use batchline_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobName;

/// One exclusive, time-boxed claim on a job name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    key: JobName,
    holder_token: String,
    expires_at: DateTime<Utc>,
}

impl Lease {
    /// Creates a lease record.
    pub fn new(
        key: JobName,
        holder_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let holder_token = holder_token.into();
        if holder_token.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "lease holder token for '{key}' must not be empty"
            )));
        }

        Ok(Self {
            key,
            holder_token,
            expires_at,
        })
    }

    /// Returns the leased job name.
    #[must_use]
    pub fn key(&self) -> &JobName {
        &self.key
    }

    /// Returns the fencing token identifying this holder.
    #[must_use]
    pub fn holder_token(&self) -> &str {
        self.holder_token.as_str()
    }

    /// Returns the instant after which the lease is considered released.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns whether the lease is still live at `now`.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Returns a copy with a new expiry, keeping key and token.
    #[must_use]
    pub fn with_expiry(&self, expires_at: DateTime<Utc>) -> Self {
        Self {
            key: self.key.clone(),
            holder_token: self.holder_token.clone(),
            expires_at,
        }
    }
}
