use chrono::{DateTime, Utc};
use docvault_application::Clock;

/// Wall-clock adapter for the injected clock port.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
