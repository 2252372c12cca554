//! Wall-clock seam.
//!
//! Turns drive almost everything in the kernel; real time only matters for
//! familiarity decay, which counts whole days between interactions.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whole days from `earlier` to `later`. Zero if `later` is not after
/// `earlier`; saturates at `u32::MAX`.
#[must_use]
pub fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u32 {
    u32::try_from((later - earlier).num_days().max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_partial_days_round_down() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(whole_days_between(start, start + Duration::hours(47)), 1);
        assert_eq!(whole_days_between(start, start + Duration::days(30)), 30);
    }

    #[test]
    fn test_clock_going_backwards_counts_as_zero() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(whole_days_between(start, start - Duration::days(3)), 0);
    }
}
