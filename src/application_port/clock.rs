use chrono::{DateTime, Utc};

/// Source of "now" for token timestamps and expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
