use chrono::{DateTime, Utc};

/// Source of the current instant, injected so evaluation stays deterministic.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}
