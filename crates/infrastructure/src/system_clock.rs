use batchline_application::Clock;
use chrono::{DateTime, Utc};

/// Wall clock backed by the host system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
