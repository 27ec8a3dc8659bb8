//! Time sources for the session tracker.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Supplies the current instant.
///
/// Implementations must be non-decreasing within a session; the tracker does
/// not guard against a clock that runs backwards.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, truncated to whole milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same offset, so a test (or a log replay) can keep a handle
/// while the tracker owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: DateTime<Utc>,
    offset_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock fixed at `origin`.
    pub fn new(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            offset_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// The instant at offset zero.
    pub const fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    /// Milliseconds elapsed since the origin.
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::SeqCst)
    }

    /// Moves the clock to `offset_ms` after the origin.
    pub fn set_offset_ms(&self, offset_ms: i64) {
        self.offset_ms.store(offset_ms, Ordering::SeqCst);
    }

    /// Moves the clock forward by `ms`.
    pub fn advance_ms(&self, ms: i64) {
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.origin + Duration::milliseconds(self.offset_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0)
            .single()
            .expect("valid test timestamp")
    }

    #[test]
    fn manual_clock_starts_at_origin() {
        let clock = ManualClock::new(origin());
        assert_eq!(clock.now(), origin());
        assert_eq!(clock.offset_ms(), 0);
    }

    #[test]
    fn manual_clock_clones_share_offset() {
        let clock = ManualClock::new(origin());
        let handle = clock.clone();

        handle.set_offset_ms(1_500);
        assert_eq!(clock.now(), origin() + Duration::milliseconds(1_500));

        clock.advance_ms(500);
        assert_eq!(handle.offset_ms(), 2_000);
    }

    #[test]
    fn system_clock_is_non_decreasing() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn system_clock_has_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
