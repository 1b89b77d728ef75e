use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::datetime::CfDatetime;
use crate::errors::CalendarError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Days => "days",
            TimeUnit::Hours => "hours",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Seconds => "seconds",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            TimeUnit::Days => 86_400,
            TimeUnit::Hours => 3_600,
            TimeUnit::Minutes => 60,
            TimeUnit::Seconds => 1,
        }
    }
}

impl TryFrom<&str> for TimeUnit {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" | "days" | "d" => Ok(TimeUnit::Days),
            "hour" | "hours" | "hr" | "hrs" | "h" => Ok(TimeUnit::Hours),
            "minute" | "minutes" | "min" | "mins" => Ok(TimeUnit::Minutes),
            "second" | "seconds" | "sec" | "secs" | "s" => Ok(TimeUnit::Seconds),
            other => Err(format!("unknown time unit '{other}'")),
        }
    }
}

/// A CF time-units declaration, e.g. `days since 2000-01-01 00:00:00`.
/// Numeric time axes carry their values in these units relative to the
/// origin; encode/decode are exact at second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub origin: CfDatetime,
}

impl TimeUnits {
    pub fn parse(input: &str, calendar: Calendar) -> Result<Self, CalendarError> {
        let trimmed = input.trim();
        let (unit_str, origin_str) =
            trimmed
                .split_once(" since ")
                .ok_or_else(|| CalendarError::InvalidUnits {
                    input: trimmed.to_string(),
                    reason: "missing ' since ' separator".to_string(),
                })?;
        let unit =
            TimeUnit::try_from(unit_str).map_err(|reason| CalendarError::InvalidUnits {
                input: trimmed.to_string(),
                reason,
            })?;
        let origin = CfDatetime::parse(origin_str, calendar)?;
        Ok(Self { unit, origin })
    }

    /// Looks like a CF time-units string (cheap check for coordinate
    /// detection, without validating the origin date).
    pub fn is_time_units(input: &str) -> bool {
        input
            .split_once(" since ")
            .is_some_and(|(unit, _)| TimeUnit::try_from(unit).is_ok())
    }

    pub fn decode(&self, calendar: Calendar, value: f64) -> CfDatetime {
        let offset = (value * self.unit.seconds() as f64).round() as i64;
        calendar.datetime_from_seconds(calendar.seconds_from_epoch(&self.origin) + offset)
    }

    pub fn encode(&self, calendar: Calendar, t: &CfDatetime) -> f64 {
        (calendar.seconds_from_epoch(t) - calendar.seconds_from_epoch(&self.origin)) as f64
            / self.unit.seconds() as f64
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} since {}", self.unit.as_str(), self.origin)
    }
}
