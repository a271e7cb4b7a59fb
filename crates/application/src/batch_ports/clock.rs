use chrono::{DateTime, Utc};

/// Wall-clock source used for deadlines and lease expiry.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}
