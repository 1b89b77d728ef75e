use chrono::{DateTime, Utc};
use polars::prelude::*;

use cmorize_calendar::{Calendar, CfDatetime, TimeUnits};

use crate::dataset::Dataset;
use crate::error::{Result, TimeError};

/// How the source column stores its timestamps. Derived columns (resampled
/// axes, bounds variables) are written back in the same encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeEncoding {
    /// Epoch-microseconds datetime column (inherently Gregorian).
    DatetimeMicros,
    /// Numeric column with CF units metadata, any calendar.
    Numeric(TimeUnits),
}

/// An ordered timestamp sequence decoupled from the dataset substrate:
/// decoded values, the effective calendar, and the source encoding.
#[derive(Debug, Clone)]
pub struct TimeAxis {
    label: String,
    values: Vec<CfDatetime>,
    calendar: Calendar,
    encoding: TimeEncoding,
}

impl TimeAxis {
    /// Extracts the time axis from a dataset. The effective calendar is the
    /// axis `calendar` attribute when present, else the supplied default,
    /// else standard.
    pub fn from_dataset(ds: &Dataset, default_calendar: Option<Calendar>) -> Result<Self> {
        let label = ds.time_label().ok_or(TimeError::NoTimeCoordinate)?.to_string();

        let metadata_calendar = ds
            .var_attr(&label, "calendar")
            .map(Calendar::try_from)
            .transpose()?;
        let calendar = metadata_calendar
            .or(default_calendar)
            .unwrap_or(Calendar::Standard);

        let series = ds.frame().column(&label)?.as_materialized_series();

        match series.dtype() {
            DataType::Datetime(_, _) | DataType::Date => {
                if !matches!(
                    calendar,
                    Calendar::Standard | Calendar::ProlepticGregorian
                ) {
                    return Err(TimeError::InconsistentCalendar(format!(
                        "datetime-typed coordinate '{label}' cannot carry the {calendar} calendar"
                    )));
                }
                let casted =
                    series.cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
                let timestamps = casted.datetime()?;
                let mut values = Vec::with_capacity(timestamps.len());
                for idx in 0..timestamps.len() {
                    let micros = timestamps.get(idx).ok_or_else(|| {
                        TimeError::DegenerateTimeAxis(format!(
                            "null timestamp at index {idx} of '{label}'"
                        ))
                    })?;
                    values.push(datetime_from_micros(micros)?);
                }
                Ok(Self {
                    label,
                    values,
                    calendar,
                    encoding: TimeEncoding::DatetimeMicros,
                })
            }
            _ => {
                let units_str = ds
                    .var_attr(&label, "units")
                    .ok_or(TimeError::NoTimeCoordinate)?;
                let units = TimeUnits::parse(units_str, calendar)?;
                let casted = series.cast(&DataType::Float64)?;
                let numbers = casted.f64()?;
                let mut values = Vec::with_capacity(numbers.len());
                for idx in 0..numbers.len() {
                    let value = numbers.get(idx).ok_or_else(|| {
                        TimeError::DegenerateTimeAxis(format!(
                            "null time value at index {idx} of '{label}'"
                        ))
                    })?;
                    values.push(units.decode(calendar, value));
                }
                Ok(Self {
                    label,
                    values,
                    calendar,
                    encoding: TimeEncoding::Numeric(units),
                })
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn encoding(&self) -> &TimeEncoding {
        &self.encoding
    }

    pub fn values(&self) -> &[CfDatetime] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Surfaces ordering violations instead of fixing them: every step must
    /// be strictly increasing, so duplicates and reversals both fail.
    pub fn ensure_valid(&self) -> Result<()> {
        for idx in 1..self.values.len() {
            let previous = &self.values[idx - 1];
            let current = &self.values[idx];
            if current == previous {
                return Err(TimeError::DegenerateTimeAxis(format!(
                    "duplicate timestamp {current} at index {idx}"
                )));
            }
            if current < previous {
                return Err(TimeError::DegenerateTimeAxis(format!(
                    "timestamps decrease from {previous} to {current} at index {idx}"
                )));
            }
        }
        Ok(())
    }

    /// Day deltas between consecutive timestamps under the axis calendar.
    pub fn deltas_days(&self) -> Vec<f64> {
        self.values
            .windows(2)
            .map(|pair| self.calendar.days_between(&pair[0], &pair[1]))
            .collect()
    }

    /// Days covered from first to last timestamp.
    pub fn span_days(&self) -> f64 {
        match (self.values.first(), self.values.last()) {
            (Some(first), Some(last)) => self.calendar.days_between(first, last),
            _ => 0.0,
        }
    }

    /// Encodes timestamps into a column matching the source encoding.
    pub fn encode_column(&self, name: &str, values: &[CfDatetime]) -> Result<Series> {
        match &self.encoding {
            TimeEncoding::DatetimeMicros => {
                let mut micros = Vec::with_capacity(values.len());
                for value in values {
                    micros.push(micros_from_datetime(value)?);
                }
                Ok(Series::new(name.into(), micros)
                    .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?)
            }
            TimeEncoding::Numeric(units) => {
                let encoded: Vec<f64> = values
                    .iter()
                    .map(|value| units.encode(self.calendar, value))
                    .collect();
                Ok(Series::new(name.into(), encoded))
            }
        }
    }
}

fn datetime_from_micros(micros: i64) -> Result<CfDatetime> {
    let secs = micros.div_euclid(1_000_000);
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| CfDatetime::from_naive(dt.naive_utc()))
        .ok_or_else(|| {
            TimeError::DegenerateTimeAxis(format!("timestamp {micros} out of datetime range"))
        })
}

fn micros_from_datetime(value: &CfDatetime) -> Result<i64> {
    let naive = value.to_naive().ok_or_else(|| {
        TimeError::InconsistentCalendar(format!(
            "{value} is not representable on an epoch-microseconds axis"
        ))
    })?;
    let utc = naive.and_utc();
    Ok(utc.timestamp() * 1_000_000 + i64::from(utc.timestamp_subsec_nanos() / 1_000))
}
