//! Calendar events and the calendar collaborator trait.
//!
//! Events arrive from an external calendar integration with ISO-8601 start
//! and end values. A value without a time component (`2026-03-05`) marks an
//! all-day event.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// A single calendar entry as delivered by the calendar integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// ISO date (`YYYY-MM-DD`) or datetime.
    pub start: String,

    /// ISO date or datetime. Missing for open-ended entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_email: Option<String>,
}

impl CalendarEvent {
    /// Convenience constructor for timed or all-day events.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: impl Into<String>,
        end: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start: start.into(),
            end: end.map(str::to_string),
            attendee_email: None,
        }
    }

    /// True when `start` carries no time component.
    pub fn is_all_day(&self) -> bool {
        matches!(EventTime::parse(&self.start), Some(EventTime::Date(_)))
    }
}

/// A parsed event boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// Date only, all-day.
    Date(NaiveDate),
    /// Datetime with an explicit offset (RFC 3339).
    Zoned(DateTime<FixedOffset>),
    /// Datetime without offset, interpreted as the seller's wall clock.
    Floating(NaiveDateTime),
}

impl EventTime {
    /// Parse an ISO-8601 date or datetime. Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::Zoned(dt));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(Self::Floating(dt));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Self::Date)
    }

    /// Wall-clock datetime in the given timezone. Dates map to midnight.
    pub fn local_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDateTime {
        match self {
            Self::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            Self::Zoned(dt) => dt.with_timezone(tz).naive_local(),
            Self::Floating(dt) => *dt,
        }
    }
}

/// The calendar collaborator.
///
/// A user without a connected calendar should yield
/// [`CalendarError::NotConnected`]; the aggregator treats it the same as any
/// other fetch failure.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch events starting between today and `days_ahead` days out.
    /// Implementations may return a little more; the availability engine
    /// does its own windowing.
    async fn fetch_events(
        &self,
        user_id: &str,
        days_ahead: u32,
    ) -> std::result::Result<Vec<CalendarEvent>, CalendarError>;
}
