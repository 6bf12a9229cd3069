use std::sync::atomic::{AtomicU64, Ordering};

/// Source of ledger timestamps (unix milliseconds)
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Clock that only moves when told to
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Timestamp for a mutation of a record last touched at `previous`.
///
/// Strictly greater than `previous`, even if the clock stalls or steps back.
pub fn next_timestamp(clock: &dyn Clock, previous: u64) -> u64 {
    clock.now_millis().max(previous.saturating_add(1))
}
