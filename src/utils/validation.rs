use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{DateError, TimeError, ValidationError};

/// How many days past today a booking may be placed.
pub const BOOKING_WINDOW_DAYS: i64 = 30;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

pub fn parse_date(date: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| DateError::Malformed)
}

pub fn parse_time(time: &str) -> Result<NaiveTime, TimeError> {
    NaiveTime::parse_from_str(time.trim(), TIME_FORMAT).map_err(|_| TimeError::Malformed)
}

/// Checks that `date` is a calendar date inside `[today, today + 30 days]`.
pub fn validate_date(date: &str, now: NaiveDateTime) -> Result<NaiveDate, DateError> {
    let date = parse_date(date)?;
    let today = now.date();

    if date < today {
        return Err(DateError::Past);
    }

    if date > today + Duration::days(BOOKING_WINDOW_DAYS) {
        return Err(DateError::TooFarAhead);
    }

    Ok(date)
}

/// Checks that `time` is a 24-hour `HH:MM` and, for today, strictly later than `now`.
///
/// The current minute itself is rejected: at 09:00:00 a request for "09:00" fails.
pub fn validate_time(time: &str, date: NaiveDate, now: NaiveDateTime) -> Result<NaiveTime, TimeError> {
    let time = parse_time(time)?;

    if date == now.date() && time <= now.time() {
        return Err(TimeError::Past);
    }

    Ok(time)
}

pub fn validate_slot(
    date: &str,
    time: &str,
    now: NaiveDateTime,
) -> Result<(NaiveDate, NaiveTime), ValidationError> {
    let date = validate_date(date, now)?;
    let time = validate_time(time, date, now)?;
    Ok((date, time))
}

/// Rejects a required text field that is absent or blank.
pub fn validate_required(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time_key(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("2024-13-01"), Err(DateError::Malformed));
        assert_eq!(parse_date("2024-02-30"), Err(DateError::Malformed));
        assert_eq!(parse_date("01.03.2024"), Err(DateError::Malformed));
        assert_eq!(parse_date(""), Err(DateError::Malformed));
    }

    #[test]
    fn test_parse_time_rejects_out_of_range() {
        assert_eq!(parse_time("24:00"), Err(TimeError::Malformed));
        assert_eq!(parse_time("12:60"), Err(TimeError::Malformed));
        assert_eq!(parse_time("noon"), Err(TimeError::Malformed));
        assert_eq!(parse_time("12:00:00"), Err(TimeError::Malformed));
    }

    #[test]
    fn test_time_key_is_zero_padded() {
        let time = parse_time("9:05").unwrap();
        assert_eq!(format_time_key(time), "09:05");
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let now = at("2024-03-01", "12:00:00");
        assert!(validate_date("2024-03-01", now).is_ok());
        assert!(validate_date("2024-03-31", now).is_ok());
        assert_eq!(validate_date("2024-04-01", now), Err(DateError::TooFarAhead));
        assert_eq!(validate_date("2024-02-29", now), Err(DateError::Past));
    }

    #[test]
    fn test_past_time_only_checked_for_today() {
        let now = at("2024-03-01", "12:00:00");
        let tomorrow = parse_date("2024-03-02").unwrap();
        assert!(validate_time("08:00", tomorrow, now).is_ok());
        assert_eq!(validate_time("11:59", now.date(), now), Err(TimeError::Past));
    }

    #[test]
    fn test_current_minute_with_seconds_is_past() {
        let now = at("2024-03-01", "09:00:30");
        assert_eq!(validate_time("09:00", now.date(), now), Err(TimeError::Past));
        assert!(validate_time("09:01", now.date(), now).is_ok());
    }

    #[test]
    fn test_validate_slot_reports_date_before_time() {
        let now = at("2024-03-01", "12:00:00");
        assert_eq!(
            validate_slot("bad", "bad", now),
            Err(ValidationError::Date(DateError::Malformed))
        );
        assert_eq!(
            validate_slot("2024-03-02", "bad", now),
            Err(ValidationError::Time(TimeError::Malformed))
        );
    }

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("subject", Some("  Math ")).unwrap(), "Math");
        assert_eq!(
            validate_required("subject", Some("   ")),
            Err(ValidationError::MissingField("subject"))
        );
        assert_eq!(
            validate_required("service", None),
            Err(ValidationError::MissingField("service"))
        );
    }
}
