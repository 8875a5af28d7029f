//! Monotone UTC time source (component B).
//!
//! Every service that needs "now" takes a `Arc<dyn Clock>` rather than
//! calling `Utc::now()` directly, so tests can advance time deterministically
//! (scenario 4: "Advance virtual clock by 2·heartbeatIntervalSeconds").

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// forward when explicitly advanced, never on its own.
pub struct VirtualClock {
    millis_since_epoch: AtomicI64,
}

impl VirtualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            millis_since_epoch: AtomicI64::new(start.timestamp_millis()),
        })
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.millis_since_epoch
        .fetch_add(delta.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis_since_epoch
        .store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        let millis = self.millis_since_epoch.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn virtual_clock_only_moves_when_advanced() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = VirtualClock::new(start);
        assert_eq!(clock.now_utc(), start);
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(clock.now_utc(), start + chrono::Duration::seconds(90));
    }
}
