use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::errors::CalendarError;

/// A civil datetime with no embedded calendar. Whether a value such as
/// 2001-02-29 is meaningful depends on the [`Calendar`] it is judged
/// against; the derived ordering is chronological within a single calendar.
///
/// Resolution is whole seconds. Sub-second precision from host datetime
/// columns is truncated at the adapter boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CfDatetime {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CfDatetime {
    pub fn new(
        year: i64,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        calendar: Calendar,
    ) -> Result<Self, CalendarError> {
        let value = Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        };
        calendar.validate(&value)?;
        Ok(value)
    }

    pub fn from_ymd(
        year: i64,
        month: u32,
        day: u32,
        calendar: Calendar,
    ) -> Result<Self, CalendarError> {
        Self::new(year, month, day, 0, 0, 0, calendar)
    }

    /// Unchecked constructor for internally derived dates (month starts,
    /// decoded day numbers) that are valid by construction.
    pub(crate) const fn raw_ymd(year: i64, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    /// Parses `YYYY-MM-DD`, optionally followed by `THH:MM[:SS]` or
    /// ` HH:MM[:SS]`. Negative years are accepted.
    pub fn parse(input: &str, calendar: Calendar) -> Result<Self, CalendarError> {
        let trimmed = input.trim();
        let fail = |reason: &str| CalendarError::Parse {
            input: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let (date_part, time_part) = match trimmed.split_once(['T', ' ']) {
            Some((d, t)) => (d, Some(t)),
            None => (trimmed, None),
        };

        let (negative, date_digits) = match date_part.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, date_part),
        };
        let mut fields = date_digits.split('-');
        let year_abs: i64 = fields
            .next()
            .ok_or_else(|| fail("missing year"))?
            .parse()
            .map_err(|_| fail("year is not a number"))?;
        let month: u32 = fields
            .next()
            .ok_or_else(|| fail("missing month"))?
            .parse()
            .map_err(|_| fail("month is not a number"))?;
        let day: u32 = fields
            .next()
            .ok_or_else(|| fail("missing day"))?
            .parse()
            .map_err(|_| fail("day is not a number"))?;
        if fields.next().is_some() {
            return Err(fail("too many date fields"));
        }
        let year = if negative { -year_abs } else { year_abs };

        let (hour, minute, second) = match time_part {
            None => (0, 0, 0),
            Some(t) => {
                let mut clock = t.split(':');
                let hour: u32 = clock
                    .next()
                    .ok_or_else(|| fail("missing hour"))?
                    .parse()
                    .map_err(|_| fail("hour is not a number"))?;
                let minute: u32 = clock
                    .next()
                    .ok_or_else(|| fail("missing minute"))?
                    .parse()
                    .map_err(|_| fail("minute is not a number"))?;
                let second: u32 = match clock.next() {
                    Some(s) => s
                        .parse::<f64>()
                        .map_err(|_| fail("second is not a number"))?
                        as u32,
                    None => 0,
                };
                (hour, minute, second)
            }
        };

        Self::new(year, month, day, hour, minute, second, calendar)
    }

    /// Conversion from a chrono datetime; only meaningful for the
    /// standard/proleptic-Gregorian calendars.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self {
            year: i64::from(dt.year()),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }

    /// Back to chrono; `None` when the year falls outside chrono's range.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let year = i32::try_from(self.year).ok()?;
        NaiveDate::from_ymd_opt(year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
    }

    pub fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }
}

impl fmt::Display for CfDatetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, year_abs) = if self.year < 0 {
            ("-", -self.year)
        } else {
            ("", self.year)
        };
        write!(
            f,
            "{sign}{year_abs:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
