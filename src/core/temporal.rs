//! Logical clocks and time helpers
//!
//! Every timestamp in the store is an unsigned count of microseconds. A
//! [`Clock`] is handed to the store at construction and is only consulted
//! when a caller leaves `tx_id` unspecified.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of microsecond timestamps
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current timestamp in microseconds
    fn now_ts(&self) -> u64;
}

/// Microseconds since the Unix epoch according to the system clock
fn wall_micros() -> u64 {
    u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
}

/// Clock that never goes backwards within a process.
///
/// Readings start at the wall time observed when the clock was built and are
/// advanced by a steady [`Instant`], so later system clock adjustments have no
/// effect. The anchor keeps ids comparable with those persisted by earlier
/// runs against the same store.
#[derive(Debug)]
pub struct MonotonicClock {
    anchor_micros: u64,
    origin: Instant,
    /// Highest value handed out so far
    last: AtomicU64,
}

impl MonotonicClock {
    /// Create a clock anchored at the current wall time
    pub fn new() -> Self {
        Self::anchored_at(wall_micros())
    }

    /// Create a clock whose first reading is `anchor_micros`
    pub fn anchored_at(anchor_micros: u64) -> Self {
        Self {
            anchor_micros,
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ts(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX);
        let candidate = self.anchor_micros.saturating_add(elapsed);
        let previous = self.last.fetch_max(candidate, Ordering::AcqRel);
        previous.max(candidate)
    }
}

/// Clock backed directly by the system time.
///
/// Suitable for human-meaningful `valid_from` stamps. It follows the system
/// clock, so it can go backwards if the clock is adjusted.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl WallClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for WallClock {
    fn now_ts(&self) -> u64 {
        wall_micros()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Set the current reading
    pub fn set(&self, ts: u64) {
        self.now.store(ts, Ordering::Release);
    }

    /// Move the reading forward by `delta` and return the new value
    pub fn advance(&self, delta: u64) -> u64 {
        let previous = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| {
                Some(now.saturating_add(delta))
            })
            .unwrap_or_else(|now| now);
        previous.saturating_add(delta)
    }
}

impl Clock for ManualClock {
    fn now_ts(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

/// Convert a UTC datetime to microseconds since the epoch.
///
/// Returns `None` for instants before the epoch.
pub fn micros_from_datetime(dt: DateTime<Utc>) -> Option<u64> {
    u64::try_from(dt.timestamp_micros()).ok()
}

/// Convert microseconds since the epoch back to a UTC datetime
pub fn datetime_from_micros(micros: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(micros / 1_000_000).ok()?;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_monotonic_clock_never_decreases() {
        let clock = MonotonicClock::new();
        let mut previous = clock.now_ts();
        for _ in 0..10_000 {
            let next = clock.now_ts();
            assert!(next >= previous);
            previous = next;
        }
    }

    #[test]
    fn test_monotonic_clock_starts_at_anchor() {
        let clock = MonotonicClock::anchored_at(1_000_000);
        let ts = clock.now_ts();
        assert!(ts >= 1_000_000);
        assert!(ts < 1_000_000 + 60_000_000);
    }

    #[test]
    fn test_monotonic_clock_shared_across_threads() {
        let clock = Arc::new(MonotonicClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || {
                    let mut previous = 0;
                    for _ in 0..1_000 {
                        let next = clock.now_ts();
                        assert!(next >= previous);
                        previous = next;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_wall_clock_tracks_system_time() {
        let clock = WallClock::new();
        let before = micros_from_datetime(Utc::now()).unwrap();
        let ts = clock.now_ts();
        assert!(ts >= before);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.now_ts(), 10);
        assert_eq!(clock.advance(5), 15);
        assert_eq!(clock.now_ts(), 15);
        clock.set(3);
        assert_eq!(clock.now_ts(), 3);
    }

    #[test]
    fn test_manual_clock_advance_saturates() {
        let clock = ManualClock::new(u64::MAX - 1);
        assert_eq!(clock.advance(5), u64::MAX);
        assert_eq!(clock.now_ts(), u64::MAX);
        assert_eq!(clock.advance(1), u64::MAX);
    }

    #[test]
    fn test_datetime_conversion() {
        let dt = Utc.with_ymd_and_hms(2022, 6, 15, 14, 30, 0).unwrap();
        let micros = micros_from_datetime(dt).unwrap();
        assert_eq!(micros, 1_655_303_400_000_000);
        assert_eq!(datetime_from_micros(micros), Some(dt));

        let before_epoch = Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(micros_from_datetime(before_epoch), None);
    }
}
