use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("unsupported calendar kind '{0}'")]
    UnsupportedKind(String),

    #[error("invalid date {year:04}-{month:02}-{day:02} for the {calendar} calendar")]
    InvalidDate {
        year: i64,
        month: u32,
        day: u32,
        calendar: &'static str,
    },

    #[error("invalid time of day {hour:02}:{minute:02}:{second:02}")]
    InvalidTime { hour: u32, minute: u32, second: u32 },

    #[error("cannot parse '{input}' as a datetime: {reason}")]
    Parse { input: String, reason: String },

    #[error("cannot parse '{input}' as CF time units: {reason}")]
    InvalidUnits { input: String, reason: String },
}
