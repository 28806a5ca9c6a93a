use crate::error::{config_error, PrereadResult};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Resolve a wall-clock time in the given zone.
///
/// Ambiguous times (DST fall back) resolve to the earlier instant. Times that do
/// not exist (DST spring forward) are an error.
pub fn resolve_local(tz: &Tz, naive: &NaiveDateTime) -> PrereadResult<DateTime<Tz>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(config_error(&format!(
            "Local time {} does not exist in {}",
            naive, tz
        ))),
    }
}

/// Calculate the next daily run strictly after `now`.
///
/// A target inside a DST gap runs at the first valid instant after the gap.
pub fn next_daily_run(now: &DateTime<Tz>, time_str: &str) -> PrereadResult<DateTime<Tz>> {
    let (hour, minute) = parse_time(time_str)
        .ok_or_else(|| config_error(&format!("Invalid time format: {}", time_str)))?;
    let tz = now.timezone();

    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| config_error("Failed to create datetime"))?;
    let next = resolve_forward(&tz, &today)?;

    // If we've already passed the target time today, move to tomorrow
    if next <= *now {
        let tomorrow = today + Duration::days(1);
        return resolve_forward(&tz, &tomorrow);
    }

    Ok(next)
}

/// Like `resolve_local`, but a time inside a gap moves to the first valid minute after it
fn resolve_forward(tz: &Tz, naive: &NaiveDateTime) -> PrereadResult<DateTime<Tz>> {
    if let Some(dt) = tz.from_local_datetime(naive).earliest() {
        return Ok(dt);
    }
    (1..=180)
        .filter_map(|m| tz.from_local_datetime(&(*naive + Duration::minutes(m))).earliest())
        .next()
        .ok_or_else(|| config_error(&format!("Local time {} does not exist in {}", naive, tz)))
}

/// Half-open range [local midnight, next local midnight) of `date`
pub fn day_bounds(tz: &Tz, date: NaiveDate) -> PrereadResult<(DateTime<Tz>, DateTime<Tz>)> {
    let start = start_of_day(tz, date)?;
    let next_date = date
        .succ_opt()
        .ok_or_else(|| config_error("Date out of range"))?;
    let end = start_of_day(tz, next_date)?;
    Ok((start, end))
}

/// First instant of `date` in the zone; zones that skip midnight start at the first valid minute
fn start_of_day(tz: &Tz, date: NaiveDate) -> PrereadResult<DateTime<Tz>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| config_error("Failed to create datetime"))?;
    resolve_forward(tz, &midnight)
}

/// Today's date in the zone
pub fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Calculate the wait until `next`, never less than one second.
///
/// Rounds up so the sleep never ends before `next`.
pub fn wait_duration(now: &DateTime<Tz>, next: &DateTime<Tz>) -> std::time::Duration {
    match next.signed_duration_since(*now).to_std() {
        Ok(wait) if wait.as_secs() >= 1 => {
            let rounded = if wait.subsec_nanos() > 0 {
                wait.as_secs() + 1
            } else {
                wait.as_secs()
            };
            std::time::Duration::from_secs(rounded)
        }
        _ => std::time::Duration::from_secs(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Helsinki;

    #[test]
    fn test_parse_time() {
        // Valid cases
        assert_eq!(parse_time("00:00"), Some((0, 0)));
        assert_eq!(parse_time("06:00"), Some((6, 0)));
        assert_eq!(parse_time("23:59"), Some((23, 59)));

        // Invalid cases
        assert_eq!(parse_time("24:00"), None);
        assert_eq!(parse_time("12:60"), None);
        assert_eq!(parse_time("12:30:45"), None);
        assert_eq!(parse_time("12"), None);
        assert_eq!(parse_time("ab:30"), None);
    }

    #[test]
    fn test_next_daily_run() {
        let now = Helsinki.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();

        // Later today
        let result = next_daily_run(&now, "15:30").unwrap();
        assert_eq!(result.format("%Y-%m-%d %H:%M").to_string(), "2025-01-01 15:30");

        // Earlier today, should be tomorrow
        let result = next_daily_run(&now, "06:00").unwrap();
        assert_eq!(result.format("%Y-%m-%d %H:%M").to_string(), "2025-01-02 06:00");

        // Exactly now, should be tomorrow
        let result = next_daily_run(&now, "10:00").unwrap();
        assert_eq!(result.format("%Y-%m-%d %H:%M").to_string(), "2025-01-02 10:00");

        assert!(next_daily_run(&now, "25:00").is_err());
    }

    #[test]
    fn test_next_daily_run_skipped_hour() {
        // Helsinki jumps from 03:00 to 04:00 on 2025-03-30
        let now = Helsinki.with_ymd_and_hms(2025, 3, 29, 12, 0, 0).unwrap();
        let result = next_daily_run(&now, "03:30").unwrap();
        assert_eq!(result.to_rfc3339(), "2025-03-30T04:00:00+03:00");

        // Retrying on the day itself still lands on that day
        let now = Helsinki.with_ymd_and_hms(2025, 3, 30, 1, 0, 0).unwrap();
        let result = next_daily_run(&now, "03:30").unwrap();
        assert_eq!(result.to_rfc3339(), "2025-03-30T04:00:00+03:00");

        // Once it has passed, tomorrow's normal time
        let now = Helsinki.with_ymd_and_hms(2025, 3, 30, 5, 0, 0).unwrap();
        let result = next_daily_run(&now, "03:30").unwrap();
        assert_eq!(result.to_rfc3339(), "2025-03-31T03:30:00+03:00");
    }

    #[test]
    fn test_next_daily_run_skipped_hour_new_york() {
        use chrono_tz::America::New_York;

        // 02:00 jumps to 03:00 on 2025-03-09
        let now = New_York.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap();
        let result = next_daily_run(&now, "02:30").unwrap();
        assert_eq!(result.to_rfc3339(), "2025-03-09T03:00:00-04:00");
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let (start, end) = day_bounds(&Helsinki, date).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-01-01T00:00:00+02:00");
        assert_eq!(end.to_rfc3339(), "2025-01-02T00:00:00+02:00");
        assert_eq!((end - start).num_hours(), 24);
    }

    #[test]
    fn test_day_bounds_across_dst_change() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let (start, end) = day_bounds(&Helsinki, date).unwrap();
        assert_eq!((end - start).num_hours(), 23);
    }

    #[test]
    fn test_wait_duration() {
        let now = Helsinki.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();

        let target = now + Duration::hours(1);
        assert_eq!(wait_duration(&now, &target).as_secs(), 3600);

        // Past targets wait the minimum
        let target = now - Duration::minutes(5);
        assert_eq!(wait_duration(&now, &target).as_secs(), 1);

        let next = next_daily_run(&now, "09:30").unwrap();
        assert_eq!(wait_duration(&now, &next).as_secs(), 23 * 3600 + 30 * 60);

        // Fractions round up so the sleep never ends early
        let target = now + Duration::milliseconds(2500);
        assert_eq!(wait_duration(&now, &target).as_secs(), 3);
    }
}
