use crate::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Must be called before the process spawns threads, otherwise the platform
/// refuses to report the offset and UTC is used.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn start_of_day(now: OffsetDateTime, offset: UtcOffset) -> OffsetDateTime {
    now.to_offset(offset).replace_time(Time::MIDNIGHT)
}

pub fn today_at_midnight(offset: UtcOffset) -> OffsetDateTime {
    start_of_day(OffsetDateTime::now_utc(), offset)
}

/// Accepts RFC3339, `YYYY-MM-DD HH:MM[:SS]` or a bare `YYYY-MM-DD`
/// (midnight). Inputs without an offset are read in `offset`.
pub fn parse_due_date(raw: &str, offset: UtcOffset) -> Result<OffsetDateTime, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("due date is required"));
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(parsed);
    }

    let with_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, with_seconds) {
        return Ok(parsed.assume_offset(offset));
    }

    let with_minutes = format_description!("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, with_minutes) {
        return Ok(parsed.assume_offset(offset));
    }

    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(parsed) = Date::parse(trimmed, date_only) {
        return Ok(parsed.midnight().assume_offset(offset));
    }

    Err(AppError::invalid_input(
        "due date must be RFC3339, YYYY-MM-DD HH:MM[:SS] or YYYY-MM-DD",
    ))
}

pub fn format_date(value: OffsetDateTime, offset: UtcOffset) -> Result<String, AppError> {
    value
        .to_offset(offset)
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn format_date_time(value: OffsetDateTime, offset: UtcOffset) -> Result<String, AppError> {
    value
        .to_offset(offset)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}
