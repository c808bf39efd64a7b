//! Wall-clock stamps for timer deadlines.
//!
//! Deadlines are wall-clock based (second + millisecond remainder) rather
//! than monotonic, so the loop can detect the system clock moving backward
//! and force pending timers due instead of delaying them indefinitely.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A wall-clock instant split into whole seconds and a millisecond
/// remainder. Ordering is lexicographic on `(sec, ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct WallTime {
    pub(crate) sec: i64,
    pub(crate) ms: i64,
}

impl WallTime {
    /// The current wall-clock time.
    pub(crate) fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Self {
            sec: since_epoch.as_secs() as i64,
            ms: i64::from(since_epoch.subsec_millis()),
        }
    }

    /// This stamp shifted forward by `delay`, carrying millisecond
    /// overflow into the seconds field.
    pub(crate) fn after(self, delay: Duration) -> Self {
        let delay_ms = delay.as_millis() as i64;

        let mut sec = self.sec + delay_ms / 1000;
        let mut ms = self.ms + delay_ms % 1000;

        if ms >= 1000 {
            sec += 1;
            ms -= 1000;
        }

        Self { sec, ms }
    }

    /// Time remaining from `self` until `deadline`, clamped to zero when
    /// the deadline has already passed.
    pub(crate) fn until(self, deadline: WallTime) -> Duration {
        let remaining_ms =
            (deadline.sec - self.sec) * 1000 + (deadline.ms - self.ms);

        if remaining_ms <= 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(remaining_ms as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_carries_millisecond_overflow() {
        let base = WallTime { sec: 10, ms: 900 };
        let shifted = base.after(Duration::from_millis(250));

        assert_eq!(shifted, WallTime { sec: 11, ms: 150 });
    }

    #[test]
    fn after_whole_seconds() {
        let base = WallTime { sec: 5, ms: 10 };
        let shifted = base.after(Duration::from_secs(3));

        assert_eq!(shifted, WallTime { sec: 8, ms: 10 });
    }

    #[test]
    fn until_clamps_past_deadlines_to_zero() {
        let now = WallTime { sec: 100, ms: 500 };
        let past = WallTime { sec: 99, ms: 0 };

        assert_eq!(now.until(past), Duration::ZERO);
    }

    #[test]
    fn until_spans_a_second_boundary() {
        let now = WallTime { sec: 100, ms: 800 };
        let deadline = WallTime { sec: 101, ms: 100 };

        assert_eq!(now.until(deadline), Duration::from_millis(300));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let earlier = WallTime { sec: 7, ms: 999 };
        let later = WallTime { sec: 8, ms: 0 };

        assert!(earlier < later);
    }
}
