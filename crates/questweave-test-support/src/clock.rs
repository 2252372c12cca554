//! Test clock: a wall clock frozen at a chosen instant.

use chrono::{DateTime, Duration, TimeZone, Utc};
use questweave_core::clock::Clock;

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// The instant every test session starts at: 2026-01-15 10:00 UTC.
    #[must_use]
    pub fn session_start() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH),
        )
    }

    /// The same clock moved forward by whole days, for decay scenarios.
    #[must_use]
    pub fn days_later(self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
