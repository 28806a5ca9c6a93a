use super::models::CalendarEvent;
use crate::error::{google_calendar_error, PrereadResult};
use crate::utils::time::resolve_local;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

/// Get event start time in the given zone.
///
/// Timed events carry an RFC 3339 `dateTime`; a value without offset is read as
/// local wall-clock time. All-day events start at local midnight of their `date`.
pub fn get_event_start(event: &CalendarEvent, tz: &Tz) -> PrereadResult<Option<DateTime<Tz>>> {
    if let Some(start_time) = &event.start_date_time {
        if let Ok(dt) = DateTime::parse_from_rfc3339(start_time) {
            return Ok(Some(dt.with_timezone(tz)));
        }
        let naive = NaiveDateTime::parse_from_str(start_time, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| google_calendar_error(&format!("Failed to parse datetime: {}", e)))?;
        Ok(Some(resolve_local(tz, &naive)?))
    } else if let Some(start_date) = &event.start_date {
        let date = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
            .map_err(|e| google_calendar_error(&format!("Failed to parse date: {}", e)))?;
        let (midnight, _) = crate::utils::time::day_bounds(tz, date)?;
        Ok(Some(midnight))
    } else {
        Ok(None)
    }
}
