//! The free-slot sweep.

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use dealdesk_core::calendar::{CalendarEvent, EventTime};
use serde::{Deserialize, Serialize};

use crate::format_minute;
use crate::hours::BusinessHours;

/// An occupied range on one day, in minutes since that day's midnight.
///
/// `end_minute` may exceed 24:00 for events running past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start_minute: i64,
    pub end_minute: i64,
}

/// A bookable gap. Always at least `min_slot` long and inside business hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    /// Offset from today (0..window_days).
    pub day: u32,
    pub start_minute: u32,
    pub end_minute: u32,
}

impl FreeSlot {
    pub fn duration_minutes(&self) -> u32 {
        self.end_minute - self.start_minute
    }

    /// `HH:MM-HH:MM`
    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            format_minute(self.start_minute),
            format_minute(self.end_minute)
        )
    }
}

/// Events that fell on one day of the window.
#[derive(Debug, Clone, Default)]
pub(crate) struct DayBucket {
    pub(crate) all_day: bool,
    pub(crate) event_count: usize,
    pub(crate) intervals: Vec<BusyInterval>,
}

/// Computes free slots for a fixed window. Stateless; create one and reuse it.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityEngine {
    hours: BusinessHours,
}

impl AvailabilityEngine {
    pub fn new(hours: BusinessHours) -> Self {
        Self { hours }
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    /// One list of free slots per day, `window_days` lists, day 0 = today.
    ///
    /// Events whose start cannot be parsed, or that fall outside the window,
    /// are ignored.
    pub fn compute_free_slots<Tz: TimeZone>(
        &self,
        events: &[CalendarEvent],
        now: &DateTime<Tz>,
    ) -> Vec<Vec<FreeSlot>> {
        let now_minute = minute_of_day(&now.naive_local());
        self.bucket(events, now)
            .iter()
            .enumerate()
            .map(|(day, bucket)| self.day_slots(day as u32, bucket, now_minute))
            .collect()
    }

    /// Group events into per-day buckets anchored at `now`'s calendar date.
    pub(crate) fn bucket<Tz: TimeZone>(
        &self,
        events: &[CalendarEvent],
        now: &DateTime<Tz>,
    ) -> Vec<DayBucket> {
        let tz = now.timezone();
        let today = now.naive_local().date();
        let mut buckets = vec![DayBucket::default(); self.hours.window_days as usize];

        for event in events {
            let Some(start) = EventTime::parse(&event.start) else {
                continue;
            };
            let local_start = start.local_in(&tz);
            let offset = (local_start.date() - today).num_days();
            if offset < 0 || offset >= buckets.len() as i64 {
                continue;
            }
            let bucket = &mut buckets[offset as usize];
            bucket.event_count += 1;

            if matches!(start, EventTime::Date(_)) {
                bucket.all_day = true;
                continue;
            }

            let midnight = local_start.date().and_time(NaiveTime::MIN);
            let start_minute = (local_start - midnight).num_minutes();
            let end_minute = event
                .end
                .as_deref()
                .and_then(EventTime::parse)
                .map(|end| (end.local_in(&tz) - midnight).num_minutes())
                .filter(|&end| end > start_minute)
                .unwrap_or(start_minute + i64::from(self.hours.default_event_minutes));

            bucket.intervals.push(BusyInterval {
                start_minute,
                end_minute,
            });
        }

        for bucket in &mut buckets {
            bucket.intervals.sort_by_key(|iv| iv.start_minute);
        }
        buckets
    }

    /// Sweep one day's bucket.
    pub(crate) fn day_slots(&self, day: u32, bucket: &DayBucket, now_minute: u32) -> Vec<FreeSlot> {
        // An all-day entry blocks the whole day, whatever else is scheduled.
        if bucket.all_day {
            return Vec::new();
        }

        let open = i64::from(self.hours.day_start);
        let close = i64::from(self.hours.day_end);
        let min_slot = i64::from(self.hours.min_slot);
        let mut pointer = i64::from(self.hours.scan_start(day, now_minute));
        let mut slots = Vec::new();

        for iv in &bucket.intervals {
            if iv.start_minute - pointer >= min_slot {
                let start = pointer.max(open);
                let end = iv.start_minute.min(close);
                if end - start >= min_slot {
                    slots.push(FreeSlot {
                        day,
                        start_minute: start as u32,
                        end_minute: end as u32,
                    });
                }
            }
            pointer = pointer.max(iv.end_minute);
        }

        if close - pointer >= min_slot {
            slots.push(FreeSlot {
                day,
                start_minute: pointer.max(open) as u32,
                end_minute: close as u32,
            });
        }

        slots
    }
}

/// [`AvailabilityEngine::compute_free_slots`] with default business hours.
pub fn compute_free_slots<Tz: TimeZone>(
    events: &[CalendarEvent],
    now: &DateTime<Tz>,
) -> Vec<Vec<FreeSlot>> {
    AvailabilityEngine::default().compute_free_slots(events, now)
}

pub(crate) fn minute_of_day(dt: &NaiveDateTime) -> u32 {
    dt.hour() * 60 + dt.minute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn now_at(h: u32, m: u32) -> DateTime<Utc> {
        // Monday 2 March 2026
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn timed(id: &str, start: &str, end: Option<&str>) -> CalendarEvent {
        CalendarEvent::new(id, format!("Event {id}"), start, end)
    }

    fn labels(slots: &[FreeSlot]) -> Vec<String> {
        slots.iter().map(FreeSlot::label).collect()
    }

    #[test]
    fn empty_today_starts_at_next_half_hour() {
        let slots = compute_free_slots(&[], &now_at(9, 7));
        assert_eq!(slots.len(), 7);
        assert_eq!(labels(&slots[0]), vec!["09:30-18:00"]);
        for day in &slots[1..] {
            assert_eq!(labels(day), vec!["08:00-18:00"]);
        }
    }

    #[test]
    fn single_event_splits_the_day() {
        let events = vec![timed(
            "demo",
            "2026-03-02T10:00:00Z",
            Some("2026-03-02T11:00:00Z"),
        )];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[0]), vec!["09:00-10:00", "11:00-18:00"]);
    }

    #[test]
    fn overlapping_events_merge() {
        let events = vec![
            timed("a", "2026-03-03T10:00:00Z", Some("2026-03-03T11:30:00Z")),
            timed("b", "2026-03-03T11:00:00Z", Some("2026-03-03T12:00:00Z")),
        ];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["08:00-10:00", "12:00-18:00"]);
    }

    #[test]
    fn contained_event_does_not_regress_pointer() {
        let events = vec![
            timed("outer", "2026-03-03T09:00:00Z", Some("2026-03-03T15:00:00Z")),
            timed("inner", "2026-03-03T10:00:00Z", Some("2026-03-03T11:00:00Z")),
        ];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["08:00-09:00", "15:00-18:00"]);
    }

    #[test]
    fn unsorted_input_is_sorted_before_sweep() {
        let events = vec![
            timed("late", "2026-03-03T15:00:00Z", Some("2026-03-03T16:00:00Z")),
            timed("early", "2026-03-03T09:00:00Z", Some("2026-03-03T10:00:00Z")),
        ];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(
            labels(&slots[1]),
            vec!["08:00-09:00", "10:00-15:00", "16:00-18:00"]
        );
    }

    #[test]
    fn all_day_event_blocks_day() {
        let events = vec![
            CalendarEvent::new("holiday", "Company offsite", "2026-03-04", None),
            timed("call", "2026-03-04T10:00:00Z", Some("2026-03-04T11:00:00Z")),
        ];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert!(slots[2].is_empty());
        // Neighbouring days untouched
        assert_eq!(labels(&slots[3]), vec!["08:00-18:00"]);
    }

    #[test]
    fn missing_end_defaults_to_one_hour() {
        let events = vec![timed("quick", "2026-03-03T13:00:00Z", None)];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["08:00-13:00", "14:00-18:00"]);
    }

    #[test]
    fn unparseable_end_defaults_to_one_hour() {
        let events = vec![timed("quick", "2026-03-03T13:00:00Z", Some("soon"))];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["08:00-13:00", "14:00-18:00"]);
    }

    #[test]
    fn end_before_start_defaults_to_one_hour() {
        let events = vec![timed(
            "inverted",
            "2026-03-03T10:00:00Z",
            Some("2026-03-03T09:00:00Z"),
        )];
        let slots = compute_free_slots(&events, &now_at(17, 40));
        assert_eq!(labels(&slots[1]), vec!["08:00-10:00", "11:00-18:00"]);
    }

    #[test]
    fn zero_length_event_defaults_to_one_hour() {
        let events = vec![timed(
            "instant",
            "2026-03-03T13:00:00Z",
            Some("2026-03-03T13:00:00Z"),
        )];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["08:00-13:00", "14:00-18:00"]);
    }

    #[test]
    fn gap_shorter_than_minimum_is_skipped() {
        let events = vec![
            timed("a", "2026-03-03T10:00:00Z", Some("2026-03-03T10:50:00Z")),
            timed("b", "2026-03-03T11:10:00Z", Some("2026-03-03T12:00:00Z")),
        ];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["08:00-10:00", "12:00-18:00"]);
    }

    #[test]
    fn event_past_closing_clips_the_candidate() {
        // The gap before an evening event is clipped to 18:00, not discarded.
        let events = vec![timed(
            "dinner",
            "2026-03-03T18:30:00Z",
            Some("2026-03-03T20:00:00Z"),
        )];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["08:00-18:00"]);
    }

    #[test]
    fn event_running_into_business_hours_moves_pointer() {
        let events = vec![
            timed("gym", "2026-03-03T06:00:00Z", Some("2026-03-03T09:00:00Z")),
            timed("review", "2026-03-03T17:00:00Z", Some("2026-03-03T19:00:00Z")),
        ];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[1]), vec!["09:00-17:00"]);
    }

    #[test]
    fn after_closing_today_has_no_slots() {
        let slots = compute_free_slots(&[], &now_at(18, 30));
        assert!(slots[0].is_empty());
        assert_eq!(labels(&slots[1]), vec!["08:00-18:00"]);
    }

    #[test]
    fn events_outside_window_are_ignored() {
        let events = vec![
            timed("past", "2026-03-01T10:00:00Z", Some("2026-03-01T11:00:00Z")),
            timed("far", "2026-03-09T10:00:00Z", Some("2026-03-09T11:00:00Z")),
            CalendarEvent::new("bad", "Bad", "whenever", None),
        ];
        let slots = compute_free_slots(&events, &now_at(9, 0));
        assert_eq!(labels(&slots[0]), vec!["09:00-18:00"]);
        assert_eq!(labels(&slots[6]), vec!["08:00-18:00"]);
    }

    #[test]
    fn buckets_by_local_date() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap();
        let events = vec![timed(
            "late",
            "2026-03-03T14:00:00Z",
            Some("2026-03-03T15:00:00Z"),
        )];
        let slots = AvailabilityEngine::default().compute_free_slots(&events, &now);
        // 14:00Z on the 3rd is 09:00-10:00 local on day 1.
        assert_eq!(labels(&slots[1]), vec!["08:00-09:00", "10:00-18:00"]);
    }

    #[test]
    fn custom_hours_are_respected() {
        let engine = AvailabilityEngine::new(BusinessHours {
            day_start: 9 * 60,
            day_end: 12 * 60,
            window_days: 2,
            ..Default::default()
        });
        let slots = engine.compute_free_slots(&[], &now_at(7, 0));
        assert_eq!(slots.len(), 2);
        assert_eq!(labels(&slots[0]), vec!["09:00-12:00"]);
    }

    #[test]
    fn every_slot_is_long_enough_and_in_bounds() {
        let mut events = Vec::new();
        for day in 2..9u32 {
            for (i, (sh, sm, dur)) in [(7, 45, 50), (9, 10, 35), (9, 40, 15), (12, 5, 95), (16, 50, 120)]
                .iter()
                .enumerate()
            {
                if (day + i as u32) % 3 == 0 {
                    continue;
                }
                let start = Utc.with_ymd_and_hms(2026, 3, day, *sh, *sm, 0).unwrap();
                let end = start + chrono::Duration::minutes(*dur);
                events.push(timed(
                    &format!("{day}-{i}"),
                    &start.to_rfc3339(),
                    Some(&end.to_rfc3339()),
                ));
            }
        }

        let slots = compute_free_slots(&events, &now_at(10, 13));
        let hours = BusinessHours::default();
        for (day, day_slots) in slots.iter().enumerate() {
            for slot in day_slots {
                assert_eq!(slot.day, day as u32);
                assert!(slot.duration_minutes() >= hours.min_slot, "{slot:?}");
                assert!(slot.start_minute >= hours.day_start, "{slot:?}");
                assert!(slot.end_minute <= hours.day_end, "{slot:?}");
            }
        }
    }
}
