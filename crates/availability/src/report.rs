//! Per-day availability report handed to the prompt builder.
//!
//! The report keeps "nothing scheduled" apart from "nothing fits": an empty
//! day is [`DayStatus::FreeAllDay`], never just an empty slot list.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use dealdesk_core::calendar::CalendarEvent;
use serde::{Deserialize, Serialize};

use crate::slots::{AvailabilityEngine, FreeSlot, minute_of_day};

/// How a day should be described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Nothing scheduled and business hours not yet over.
    FreeAllDay,
    /// Some events, some gaps.
    Open,
    /// Events (or the clock) leave no gap of the minimum length.
    NoAvailability,
    /// An all-day entry blocks the day.
    AllDayEvent,
}

/// One day of the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub day: u32,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub event_count: usize,
    pub slots: Vec<FreeSlot>,
}

impl DayAvailability {
    /// Slot labels, `HH:MM-HH:MM`.
    pub fn slot_labels(&self) -> Vec<String> {
        self.slots.iter().map(FreeSlot::label).collect()
    }

    /// Short phrase for this day.
    pub fn describe(&self) -> String {
        match self.status {
            DayStatus::FreeAllDay => match self.slots.as_slice() {
                [only] => format!("free all day ({})", only.label()),
                _ => "free all day".into(),
            },
            DayStatus::Open => self.slot_labels().join(", "),
            DayStatus::NoAvailability => "no availability".into(),
            DayStatus::AllDayEvent => "blocked by an all-day event".into(),
        }
    }
}

/// The full window, day 0 = today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub days: Vec<DayAvailability>,
}

impl AvailabilityReport {
    /// Total number of bookable slots across the window.
    pub fn slot_count(&self) -> usize {
        self.days.iter().map(|d| d.slots.len()).sum()
    }

    /// Render as one line per day, e.g. `Mon 2026-03-02: 09:00-10:00, 11:00-18:00`.
    pub fn render(&self) -> String {
        self.days
            .iter()
            .map(|d| format!("{} {}: {}", d.date.weekday(), d.date, d.describe()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl AvailabilityEngine {
    /// Compute slots and classify each day.
    pub fn report<Tz: TimeZone>(
        &self,
        events: &[CalendarEvent],
        now: &DateTime<Tz>,
    ) -> AvailabilityReport {
        let local_now = now.naive_local();
        let today = local_now.date();
        let now_minute = minute_of_day(&local_now);

        let days = self
            .bucket(events, now)
            .iter()
            .enumerate()
            .map(|(day, bucket)| {
                let day = day as u32;
                let slots = self.day_slots(day, bucket, now_minute);
                let status = if bucket.all_day {
                    DayStatus::AllDayEvent
                } else if slots.is_empty() {
                    DayStatus::NoAvailability
                } else if bucket.event_count == 0 {
                    DayStatus::FreeAllDay
                } else {
                    DayStatus::Open
                };
                DayAvailability {
                    day,
                    date: today + Duration::days(i64::from(day)),
                    status,
                    event_count: bucket.event_count,
                    slots,
                }
            })
            .collect();

        AvailabilityReport { days }
    }
}
