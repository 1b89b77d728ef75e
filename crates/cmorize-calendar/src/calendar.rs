use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datetime::CfDatetime;
use crate::errors::CalendarError;

const SECONDS_PER_DAY: i64 = 86_400;

const CUM_MONTH_DAYS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// CF calendar kinds. The calendar is selected once per time axis; all day
/// arithmetic dispatches through it.
///
/// `Standard` is implemented as proleptic Gregorian — the 1582 Julian
/// splice is not modeled, since model years are continuous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Calendar {
    #[serde(rename = "standard", alias = "gregorian")]
    Standard,
    #[serde(rename = "proleptic_gregorian")]
    ProlepticGregorian,
    #[serde(rename = "julian")]
    Julian,
    #[serde(rename = "noleap", alias = "365_day")]
    NoLeap,
    #[serde(rename = "all_leap", alias = "366_day")]
    AllLeap,
    #[serde(rename = "360_day")]
    Day360,
}

impl Calendar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Calendar::Standard => "standard",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::Julian => "julian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        }
    }

    pub fn is_leap_year(&self, year: i64) -> bool {
        match self {
            Calendar::Standard | Calendar::ProlepticGregorian => {
                year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
            }
            Calendar::Julian => year.rem_euclid(4) == 0,
            Calendar::NoLeap | Calendar::Day360 => false,
            Calendar::AllLeap => true,
        }
    }

    pub fn days_in_month(&self, year: i64, month: u32) -> u32 {
        match self {
            Calendar::Day360 => 30,
            _ => {
                let base = MONTH_DAYS[(month - 1) as usize];
                if month == 2 && self.is_leap_year(year) {
                    base + 1
                } else {
                    base
                }
            }
        }
    }

    pub fn days_in_year(&self, year: i64) -> u32 {
        match self {
            Calendar::Day360 => 360,
            _ => {
                if self.is_leap_year(year) {
                    366
                } else {
                    365
                }
            }
        }
    }

    /// Mean year length in days, used as the base for nominal frequency
    /// intervals (a "month" is one twelfth of this).
    pub fn mean_year_days(&self) -> f64 {
        match self {
            Calendar::Standard | Calendar::ProlepticGregorian | Calendar::Julian => 365.25,
            Calendar::NoLeap => 365.0,
            Calendar::AllLeap => 366.0,
            Calendar::Day360 => 360.0,
        }
    }

    pub fn validate(&self, t: &CfDatetime) -> Result<(), CalendarError> {
        if t.month < 1 || t.month > 12 || t.day < 1 || t.day > self.days_in_month(t.year, t.month)
        {
            return Err(CalendarError::InvalidDate {
                year: t.year,
                month: t.month,
                day: t.day,
                calendar: self.as_str(),
            });
        }
        if t.hour > 23 || t.minute > 59 || t.second > 59 {
            return Err(CalendarError::InvalidTime {
                hour: t.hour,
                minute: t.minute,
                second: t.second,
            });
        }
        Ok(())
    }

    // Leap years in [0, year), counting year 0 as leap where applicable.
    fn leap_days_before(&self, year: i64) -> i64 {
        match self {
            Calendar::Standard | Calendar::ProlepticGregorian => {
                (year + 3).div_euclid(4) - (year + 99).div_euclid(100)
                    + (year + 399).div_euclid(400)
            }
            Calendar::Julian => (year + 3).div_euclid(4),
            _ => 0,
        }
    }

    fn days_before_year(&self, year: i64) -> i64 {
        match self {
            Calendar::Day360 => 360 * year,
            Calendar::NoLeap => 365 * year,
            Calendar::AllLeap => 366 * year,
            _ => 365 * year + self.leap_days_before(year),
        }
    }

    /// Whole days since 0000-01-01 of this calendar.
    pub fn day_number(&self, t: &CfDatetime) -> i64 {
        let before_month = match self {
            Calendar::Day360 => 30 * i64::from(t.month - 1),
            _ => {
                let mut days = CUM_MONTH_DAYS[(t.month - 1) as usize];
                if t.month > 2 && self.is_leap_year(t.year) {
                    days += 1;
                }
                days
            }
        };
        self.days_before_year(t.year) + before_month + i64::from(t.day) - 1
    }

    /// Inverse of [`Calendar::day_number`]; yields midnight of that day.
    pub fn date_from_day_number(&self, n: i64) -> CfDatetime {
        let (year, mut remainder) = match self {
            Calendar::Day360 => (n.div_euclid(360), n.rem_euclid(360)),
            Calendar::NoLeap => (n.div_euclid(365), n.rem_euclid(365)),
            Calendar::AllLeap => (n.div_euclid(366), n.rem_euclid(366)),
            _ => {
                // A /365 guess can only overshoot; walk to the right year.
                let mut year = n.div_euclid(365);
                while self.days_before_year(year) > n {
                    year -= 1;
                }
                while self.days_before_year(year + 1) <= n {
                    year += 1;
                }
                (year, n - self.days_before_year(year))
            }
        };

        let mut month = 1u32;
        loop {
            let in_month = i64::from(self.days_in_month(year, month));
            if remainder < in_month {
                break;
            }
            remainder -= in_month;
            month += 1;
        }
        CfDatetime::raw_ymd(year, month, (remainder + 1) as u32)
    }

    pub fn seconds_from_epoch(&self, t: &CfDatetime) -> i64 {
        self.day_number(t) * SECONDS_PER_DAY + t.seconds_of_day()
    }

    pub fn datetime_from_seconds(&self, seconds: i64) -> CfDatetime {
        let days = seconds.div_euclid(SECONDS_PER_DAY);
        let second_of_day = seconds.rem_euclid(SECONDS_PER_DAY);
        let date = self.date_from_day_number(days);
        CfDatetime {
            hour: (second_of_day / 3600) as u32,
            minute: ((second_of_day % 3600) / 60) as u32,
            second: (second_of_day % 60) as u32,
            ..date
        }
    }

    /// Fractional days since the calendar epoch.
    pub fn ordinal(&self, t: &CfDatetime) -> f64 {
        self.seconds_from_epoch(t) as f64 / SECONDS_PER_DAY as f64
    }

    /// Calendar-correct day offsetting, rounded to whole seconds.
    pub fn add_days(&self, t: &CfDatetime, days: f64) -> CfDatetime {
        let offset = (days * SECONDS_PER_DAY as f64).round() as i64;
        self.datetime_from_seconds(self.seconds_from_epoch(t) + offset)
    }

    /// Signed day count from `t0` to `t1`, exact at second resolution.
    pub fn days_between(&self, t0: &CfDatetime, t1: &CfDatetime) -> f64 {
        (self.seconds_from_epoch(t1) - self.seconds_from_epoch(t0)) as f64
            / SECONDS_PER_DAY as f64
    }

    pub fn start_of_month(&self, t: &CfDatetime) -> CfDatetime {
        CfDatetime::raw_ymd(t.year, t.month, 1)
    }

    pub fn start_of_next_month(&self, t: &CfDatetime) -> CfDatetime {
        if t.month == 12 {
            CfDatetime::raw_ymd(t.year + 1, 1, 1)
        } else {
            CfDatetime::raw_ymd(t.year, t.month + 1, 1)
        }
    }

    pub fn start_of_year(&self, t: &CfDatetime) -> CfDatetime {
        CfDatetime::raw_ymd(t.year, 1, 1)
    }

    pub fn start_of_next_year(&self, t: &CfDatetime) -> CfDatetime {
        CfDatetime::raw_ymd(t.year + 1, 1, 1)
    }

    /// Whichever month start is closer in time; ties go to the later one.
    pub fn nearest_month_start(&self, t: &CfDatetime) -> CfDatetime {
        let current = self.start_of_month(t);
        let next = self.start_of_next_month(t);
        let seconds = self.seconds_from_epoch(t);
        let to_current = seconds - self.seconds_from_epoch(&current);
        let to_next = self.seconds_from_epoch(&next) - seconds;
        if to_current < to_next {
            current
        } else {
            next
        }
    }

    pub fn nearest_year_start(&self, t: &CfDatetime) -> CfDatetime {
        let current = self.start_of_year(t);
        let next = self.start_of_next_year(t);
        let seconds = self.seconds_from_epoch(t);
        let to_current = seconds - self.seconds_from_epoch(&current);
        let to_next = self.seconds_from_epoch(&next) - seconds;
        if to_current < to_next {
            current
        } else {
            next
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Calendar {
    type Error = CalendarError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "julian" => Ok(Calendar::Julian),
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(CalendarError::UnsupportedKind(other.to_string())),
        }
    }
}
