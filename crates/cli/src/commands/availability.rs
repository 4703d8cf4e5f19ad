//! `dealdesk availability`: free slots for a calendar export.

use chrono::{DateTime, FixedOffset, Local};
use dealdesk_agent::business_hours;
use dealdesk_availability::{AvailabilityEngine, DayStatus};
use dealdesk_config::AppConfig;
use dealdesk_memory::load_events;
use std::path::Path;

pub async fn run(
    events_path: &Path,
    now: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let engine = AvailabilityEngine::new(business_hours(&config.availability)?);
    let now = parse_now(now)?;
    let events = load_events(events_path).await?;

    let report = engine.report(&events, &now);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📅 Availability from {}", now.format("%Y-%m-%d %H:%M %:z"));
    println!("─────────────────────────────────────");
    println!(
        "  Business hours: {}-{}, slots of at least {} min",
        config.availability.day_start,
        config.availability.day_end,
        config.availability.min_slot_minutes
    );
    println!("  Events loaded:  {}", events.len());
    println!();
    for day in &report.days {
        let marker = match day.status {
            DayStatus::FreeAllDay | DayStatus::Open => "✅",
            DayStatus::NoAvailability | DayStatus::AllDayEvent => "⛔",
        };
        println!("  {marker} {} {}: {}", day.date.format("%a"), day.date, day.describe());
    }
    println!();
    println!("  {} bookable slots", report.slot_count());

    Ok(())
}

/// `--now` as RFC 3339, or the local clock.
fn parse_now(now: Option<&str>) -> Result<DateTime<FixedOffset>, String> {
    match now {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map_err(|e| format!("Invalid --now '{value}': {e}")),
        None => Ok(Local::now().fixed_offset()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_now_keeps_its_offset() {
        let now = parse_now(Some("2026-03-02T09:07:00+01:00")).unwrap();
        assert_eq!(now.offset().local_minus_utc(), 3600);
        assert_eq!(now.format("%H:%M").to_string(), "09:07");
    }

    #[test]
    fn invalid_now_is_rejected() {
        let err = parse_now(Some("next tuesday")).unwrap_err();
        assert!(err.contains("next tuesday"));
    }
}
