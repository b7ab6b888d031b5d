use chrono::Utc;

/// Source of wall-clock time in epoch seconds
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}
