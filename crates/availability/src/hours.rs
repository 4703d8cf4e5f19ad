//! Business-hours window and slot granularity.

use serde::{Deserialize, Serialize};

/// The bounds and rounding rules the sweep works with. All values are minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// Opening time, minutes since midnight (08:00).
    pub day_start: u32,
    /// Closing time, minutes since midnight (18:00).
    pub day_end: u32,
    /// Day 0 scanning starts at `now` rounded up to this granularity.
    pub granularity: u32,
    /// Shortest gap worth offering.
    pub min_slot: u32,
    /// Duration assumed for events without an end.
    pub default_event_minutes: u32,
    /// Number of days in the window, today included.
    pub window_days: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            day_start: 8 * 60,
            day_end: 18 * 60,
            granularity: 30,
            min_slot: 30,
            default_event_minutes: 60,
            window_days: 7,
        }
    }
}

impl BusinessHours {
    /// Where the sweep begins on `day`, given the minute-of-day of `now`.
    ///
    /// Day 0 starts at `max(day_start, ceil(now / granularity) * granularity)`;
    /// every later day starts at `day_start`.
    pub fn scan_start(&self, day: u32, now_minute: u32) -> u32 {
        if day > 0 {
            return self.day_start;
        }
        let granularity = self.granularity.max(1);
        let rounded = now_minute.div_ceil(granularity) * granularity;
        rounded.max(self.day_start)
    }

    /// True when the window bounds make sense.
    pub fn is_valid(&self) -> bool {
        self.day_start < self.day_end
            && self.day_end <= 24 * 60
            && self.min_slot > 0
            && self.window_days > 0
    }
}
