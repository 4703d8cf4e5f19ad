//! Free/busy computation for the seller's calendar.
//!
//! Converts a raw event list plus "now" into per-day free slots over a fixed
//! window (seven days, day 0 = today) within business hours. Everything here
//! is synchronous, deterministic and side-effect free.
//!
//! # Algorithm
//!
//! 1. Bucket events by the date of their start, anchored at `now`'s date.
//! 2. A bucket containing an all-day event yields no slots at all.
//! 3. Timed events become busy intervals in minutes since midnight
//!    (missing end ⇒ default duration), sorted by start.
//! 4. A pointer sweeps from the day's scan start; gaps of at least the
//!    minimum slot length are emitted, clipped to business hours.
//! 5. Whatever is left before closing time becomes a trailing slot.

pub mod hours;
pub mod report;
pub mod slots;

pub use hours::BusinessHours;
pub use report::{AvailabilityReport, DayAvailability, DayStatus};
pub use slots::{AvailabilityEngine, BusyInterval, FreeSlot, compute_free_slots};

/// Format minutes since midnight as zero-padded `HH:MM`.
pub fn format_minute(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pads_hours_and_minutes() {
        assert_eq!(format_minute(0), "00:00");
        assert_eq!(format_minute(8 * 60 + 5), "08:05");
        assert_eq!(format_minute(18 * 60), "18:00");
    }
}
