use chrono::{Datelike, Days, NaiveDate, TimeDelta, Weekday};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid duration {0:?}, expected HH:MM")]
    InvalidDuration(String),
    #[error("Could not interpret date {0:?}")]
    InvalidDate(String),
}

/// Render a logged interval as a GitLab `/spend` quick action.
///
/// Full days are folded into the hour count. Leftover seconds above 30
/// bump the minute count once; the minute count is never carried back
/// into hours, so 1h59m31s renders as `1h60min`.
pub fn duration_to_spend_string(duration: TimeDelta, date: NaiveDate) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let remainder = total % 3600;
    let mut minutes = remainder / 60;
    if remainder % 60 > 30 {
        minutes += 1;
    }
    format!("/spend {hours}h{minutes}min {}", date.format("%Y-%m-%d"))
}

/// Parse an `HH:MM` estimate. Absent or empty input is a zero duration.
pub fn parse_duration(text: Option<&str>) -> Result<TimeDelta, TimeError> {
    let text = match text.map(str::trim) {
        None | Some("") => return Ok(TimeDelta::zero()),
        Some(t) => t,
    };
    let invalid = || TimeError::InvalidDuration(text.to_string());

    let (hours, minutes) = text.split_once(':').ok_or_else(invalid)?;
    let hours: i64 = hours.trim().parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.trim().parse().map_err(|_| invalid())?;

    TimeDelta::try_hours(hours)
        .zip(TimeDelta::try_minutes(minutes))
        .and_then(|(h, m)| h.checked_add(&m))
        .ok_or_else(invalid)
}

/// Format a duration as `HH:MM`, the inverse of [`parse_duration`].
pub fn format_hh_mm(duration: TimeDelta) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Interpret a human date expression relative to `today`.
///
/// Supported forms:
///   today, yesterday
///   2024-01-31
///   monday (most recent one, today included)
///   3days, 2w, 1 week ago
pub fn interpret_date(text: &str, today: NaiveDate) -> Result<NaiveDate, TimeError> {
    let normalized = text.trim().to_lowercase();
    let invalid = || TimeError::InvalidDate(text.to_string());

    match normalized.as_str() {
        "" => return Err(invalid()),
        "today" => return Ok(today),
        "yesterday" => return today.checked_sub_days(Days::new(1)).ok_or_else(invalid),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(weekday) = normalized.parse::<Weekday>() {
        let back = (7 + today.weekday().num_days_from_monday()
            - weekday.num_days_from_monday())
            % 7;
        return today
            .checked_sub_days(Days::new(u64::from(back)))
            .ok_or_else(invalid);
    }

    let span: String = normalized
        .strip_suffix("ago")
        .unwrap_or(&normalized)
        .split_whitespace()
        .collect();
    let span = humantime::parse_duration(&span).map_err(|_| invalid())?;
    today
        .checked_sub_days(Days::new(span.as_secs() / 86_400))
        .ok_or_else(invalid)
}
