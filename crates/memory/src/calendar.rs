//! Calendar providers backed by local data.
//!
//! `JsonFileCalendar` reads a per-user JSON array of events from a directory
//! (`<dir>/<user_id>.json`). A missing file means the user never connected a
//! calendar. `StaticCalendar` serves a fixed list and is used in tests.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use dealdesk_core::calendar::{CalendarEvent, CalendarProvider, EventTime};
use dealdesk_core::error::CalendarError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads `<dir>/<user_id>.json`.
pub struct JsonFileCalendar {
    dir: PathBuf,
    /// First day of the fetch window. `None` means today in UTC.
    anchor: Option<NaiveDate>,
}

impl JsonFileCalendar {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            anchor: None,
        }
    }

    /// Pin the first day of the fetch window instead of using the clock.
    pub fn anchored_at(mut self, today: NaiveDate) -> Self {
        self.anchor = Some(today);
        self
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, CalendarError> {
        let valid = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            && !user_id.starts_with('.');
        if !valid {
            return Err(CalendarError::FetchFailed(format!(
                "invalid user id '{user_id}'"
            )));
        }
        Ok(self.dir.join(format!("{user_id}.json")))
    }
}

/// Parse a JSON array of events.
pub fn parse_events(json: &str) -> Result<Vec<CalendarEvent>, CalendarError> {
    serde_json::from_str(json)
        .map_err(|e| CalendarError::FetchFailed(format!("invalid event JSON: {e}")))
}

/// Keep the events starting between `today` and `today + days_ahead`
/// (inclusive, by UTC date). Events with an unparseable start are dropped.
pub fn within_window(
    events: Vec<CalendarEvent>,
    today: NaiveDate,
    days_ahead: u32,
) -> Vec<CalendarEvent> {
    let last = today
        .checked_add_days(Days::new(u64::from(days_ahead)))
        .unwrap_or(NaiveDate::MAX);
    events
        .into_iter()
        .filter(|event| {
            EventTime::parse(&event.start)
                .map(|start| start.local_in(&Utc).date())
                .is_some_and(|day| day >= today && day <= last)
        })
        .collect()
}

/// Read and parse an events file.
pub async fn load_events(path: &Path) -> Result<Vec<CalendarEvent>, CalendarError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CalendarError::NotConnected(path.display().to_string()));
        }
        Err(e) => {
            return Err(CalendarError::FetchFailed(format!(
                "{}: {e}",
                path.display()
            )));
        }
    };
    parse_events(&content)
}

#[async_trait]
impl CalendarProvider for JsonFileCalendar {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn fetch_events(
        &self,
        user_id: &str,
        days_ahead: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let path = self.path_for(user_id)?;
        let loaded = load_events(&path).await?;
        let total = loaded.len();
        let today = self.anchor.unwrap_or_else(|| Utc::now().date_naive());
        let events = within_window(loaded, today, days_ahead);
        debug!(
            user_id = user_id,
            days_ahead = days_ahead,
            events = events.len(),
            skipped = total - events.len(),
            "Loaded calendar file"
        );
        Ok(events)
    }
}

/// A provider that always returns the same result.
pub struct StaticCalendar {
    result: Result<Vec<CalendarEvent>, CalendarError>,
}

impl StaticCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { result: Ok(events) }
    }

    /// A provider whose every fetch fails with `error`.
    pub fn failing(error: CalendarError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl CalendarProvider for StaticCalendar {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_events(
        &self,
        _user_id: &str,
        _days_ahead: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = r#"[
        {"id": "e1", "title": "Demo", "start": "2026-03-03T10:00:00Z", "end": "2026-03-03T11:00:00Z"},
        {"id": "e2", "title": "Offsite", "start": "2026-03-05"},
        {"id": "e3", "start": "2026-03-04T14:00:00", "attendee_email": "buyer@example.com"}
    ]"#;

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[tokio::test]
    async fn reads_user_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seller-1.json"), EVENTS).unwrap();

        let calendar = JsonFileCalendar::new(dir.path()).anchored_at(march(2));
        let events = calendar.fetch_events("seller-1", 7).await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(events[1].is_all_day());
        assert_eq!(events[2].title, "");
        assert_eq!(events[2].attendee_email.as_deref(), Some("buyer@example.com"));
    }

    #[tokio::test]
    async fn events_outside_window_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seller-1.json"), EVENTS).unwrap();

        // Window 4..=6 March: e1 on the 3rd falls before it.
        let calendar = JsonFileCalendar::new(dir.path()).anchored_at(march(4));
        let events = calendar.fetch_events("seller-1", 2).await.unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e3"]);

        // Window 2..=3 March keeps only e1.
        let calendar = JsonFileCalendar::new(dir.path()).anchored_at(march(2));
        let events = calendar.fetch_events("seller-1", 1).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e1");
    }

    #[test]
    fn window_drops_unparseable_start() {
        let events = vec![
            CalendarEvent::new("ok", "Call", "2026-03-02T15:00:00+01:00", None),
            CalendarEvent::new("bad", "Call", "next tuesday", None),
        ];
        let kept = within_window(events, march(2), 0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "ok");
    }

    #[tokio::test]
    async fn missing_file_is_not_connected() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = JsonFileCalendar::new(dir.path());
        let err = calendar.fetch_events("nobody", 7).await.unwrap_err();
        assert!(matches!(err, CalendarError::NotConnected(_)));
    }

    #[tokio::test]
    async fn malformed_file_is_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seller.json"), "{not json").unwrap();
        let calendar = JsonFileCalendar::new(dir.path());
        let err = calendar.fetch_events("seller", 7).await.unwrap_err();
        assert!(matches!(err, CalendarError::FetchFailed(_)));
    }

    #[tokio::test]
    async fn path_traversal_rejected() {
        let calendar = JsonFileCalendar::new("/tmp");
        assert!(calendar.fetch_events("../etc/passwd", 7).await.is_err());
        assert!(calendar.fetch_events("", 7).await.is_err());
    }

    #[tokio::test]
    async fn static_calendar_failing() {
        let calendar = StaticCalendar::failing(CalendarError::FetchFailed("timeout".into()));
        assert!(calendar.fetch_events("u", 7).await.is_err());
    }
}
