use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cmorize_calendar::{Calendar, CfDatetime};

use crate::bounds::{PointConvention, TimeMethod};
use crate::dataset::{is_numeric_dtype, Dataset};
use crate::error::{Result, TimeError};
use crate::frequency::{frequency_code, FrequencyLabel, InferOptions, DEFAULT_TOLERANCE};
use crate::resolution::check_resolution;
use crate::rule::Rule;
use crate::time_axis::TimeAxis;

/// Explicit target frequency: a nominal unit and a step multiplier,
/// parsed from codes such as "M", "2D" or "10A".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreqSpec {
    pub label: FrequencyLabel,
    pub step: u32,
}

impl FreqSpec {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(digits_end);
        let step: u32 = if digits.is_empty() {
            1
        } else {
            digits
                .parse()
                .map_err(|_| TimeError::InvalidFrequency(trimmed.to_string()))?
        };
        if step == 0 {
            return Err(TimeError::InvalidFrequency(trimmed.to_string()));
        }
        let label = match unit.to_ascii_uppercase().as_str() {
            "H" => FrequencyLabel::SubDaily,
            "D" => FrequencyLabel::Daily,
            "W" => FrequencyLabel::Weekly,
            "M" | "MS" => FrequencyLabel::Monthly,
            "Q" | "QS" => FrequencyLabel::Quarterly,
            "A" | "AS" | "Y" | "YS" => FrequencyLabel::Yearly,
            _ => return Err(TimeError::InvalidFrequency(trimmed.to_string())),
        };
        Ok(Self { label, step })
    }

    pub fn interval_days(&self, calendar: Calendar) -> f64 {
        self.label.base_days(calendar) * f64::from(self.step)
    }

    pub fn code(&self) -> String {
        frequency_code(self.label, self.step)
    }
}

/// Mean is the only aggregation resampling requires; further methods are
/// extension points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    #[default]
    Mean,
}

impl ResampleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleMethod::Mean => "mean",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResampleOptions {
    /// Explicit target frequency; takes precedence over the interval.
    pub freq: Option<FreqSpec>,
    /// Target interval in days; the resampling target when no frequency is
    /// given, otherwise only the post-hoc bounds width.
    pub target_interval_days: Option<f64>,
    pub method: ResampleMethod,
    pub strict: bool,
    pub tolerance: f64,
    pub calendar: Option<Calendar>,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            freq: None,
            target_interval_days: None,
            method: ResampleMethod::Mean,
            strict: false,
            tolerance: DEFAULT_TOLERANCE,
            calendar: None,
        }
    }
}

impl ResampleOptions {
    pub fn from_rule(rule: &Rule) -> Result<Self> {
        let freq = rule
            .frequency
            .as_deref()
            .map(FreqSpec::parse)
            .transpose()?;
        Ok(Self {
            freq,
            target_interval_days: rule.approx_interval,
            method: ResampleMethod::Mean,
            strict: rule.strict,
            tolerance: rule.tolerance,
            calendar: rule.calendar,
        })
    }
}

struct Bucket {
    start: CfDatetime,
    rows: Vec<usize>,
}

/// Resamples the dataset to the target frequency after validating that the
/// operation is a downsampling (or an exact match). Refuses to upsample.
///
/// The output carries one row per target bucket, timestamped at the bucket
/// start, with every numeric data column averaged over the bucket (nulls
/// ignored) and fresh mean-method bounds attached; bounds carried in from
/// the input are discarded. Since only the reduced representative
/// timestamps survive aggregation, those bounds are nominal-interval
/// approximations rather than observed sub-interval boundaries.
pub fn resample_safe(ds: Dataset, options: &ResampleOptions) -> Result<Dataset> {
    let axis = TimeAxis::from_dataset(&ds, options.calendar)?;
    let calendar = axis.calendar();

    let target_days = match (&options.freq, options.target_interval_days) {
        (Some(spec), _) => spec.interval_days(calendar),
        (None, Some(days)) => days,
        (None, None) => {
            return Err(TimeError::UnsafeResampling(
                "no target frequency or interval given".to_string(),
            ));
        }
    };

    let infer_options = InferOptions {
        strict: options.strict,
        tolerance: options.tolerance,
        calendar: options.calendar,
    };
    let check = check_resolution(&axis, target_days, &infer_options)?;
    if !check.is_valid_for_resampling {
        return Err(TimeError::UnsafeResampling(format!(
            "time resolution too coarse: data sampled every {:.3} days cannot be resampled to {:.3}-day intervals",
            check.inferred_interval_days, check.target_interval_days
        )));
    }

    let spec = match options.freq {
        Some(spec) => spec,
        None => closest_spec(target_days, calendar),
    };

    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    for (row, value) in axis.values().iter().enumerate() {
        let start = bucket_start(calendar, value, &spec)?;
        let key = calendar.seconds_from_epoch(&start);
        buckets
            .entry(key)
            .or_insert_with(|| Bucket {
                start,
                rows: Vec::new(),
            })
            .rows
            .push(row);
    }
    let starts: Vec<CfDatetime> = buckets.values().map(|bucket| bucket.start).collect();

    let mut columns: Vec<Column> = Vec::with_capacity(ds.frame().width());
    let mut kept: Vec<String> = Vec::with_capacity(ds.frame().width());
    for column in ds.frame().get_columns() {
        let name = column.name().as_str();
        if name == axis.label() {
            columns.push(axis.encode_column(name, &starts)?.into());
            kept.push(name.to_string());
            continue;
        }
        if !is_numeric_dtype(column.dtype()) {
            debug!(column = name, "dropping non-numeric column while resampling");
            continue;
        }
        let series = column.as_materialized_series().cast(&DataType::Float64)?;
        let values = series.f64()?;
        let mut means: Vec<Option<f64>> = Vec::with_capacity(buckets.len());
        for bucket in buckets.values() {
            let mut sum = 0.0;
            let mut count = 0usize;
            for &row in &bucket.rows {
                if let Some(value) = values.get(row) {
                    sum += value;
                    count += 1;
                }
            }
            means.push((count > 0).then(|| sum / count as f64));
        }
        columns.push(Series::new(name.into(), means).into());
        kept.push(name.to_string());
    }
    let frame = DataFrame::new(columns)?;

    let mut out = Dataset::new(frame)?;
    for (key, value) in ds.attrs() {
        out.set_attr(key.clone(), value.clone());
    }
    for name in &kept {
        if let Some(attrs) = ds.var_attrs(name) {
            for (key, value) in attrs {
                // The input's bounds reference is stale on the new axis.
                if name == axis.label() && key == "bounds" {
                    continue;
                }
                out.set_var_attr(name.clone(), key.clone(), value.clone());
            }
        }
    }

    info!(
        code = spec.code().as_str(),
        method = options.method.as_str(),
        input_rows = ds.height(),
        buckets = starts.len(),
        "resampled"
    );

    if starts.len() < 2 {
        warn!("resampled axis has a single point; skipping bounds computation");
        return Ok(out);
    }

    let bounds_rule = Rule {
        approx_interval: Some(
            options
                .target_interval_days
                .unwrap_or_else(|| spec.interval_days(calendar)),
        ),
        time_method: Some(TimeMethod::Mean),
        calendar: options.calendar,
        convention: Some(PointConvention::Start),
        ..Rule::default()
    };
    crate::bounds::time_bounds(out, &bounds_rule)
}

/// The nominal frequency whose interval best matches a target given only
/// in days (relative-error argmin over the unit/step table).
fn closest_spec(interval_days: f64, calendar: Calendar) -> FreqSpec {
    let mut best = FreqSpec {
        label: FrequencyLabel::Daily,
        step: 1,
    };
    let mut best_error = f64::INFINITY;
    for label in FrequencyLabel::ALL {
        let base = label.base_days(calendar);
        for step in 1..=12u32 {
            let test = base * f64::from(step);
            let error = ((interval_days - test) / test).abs();
            if error < best_error {
                best_error = error;
                best = FreqSpec { label, step };
            }
        }
    }
    best
}

fn bucket_start(calendar: Calendar, t: &CfDatetime, spec: &FreqSpec) -> Result<CfDatetime> {
    let step = i64::from(spec.step);
    match spec.label {
        FrequencyLabel::Monthly => month_block(calendar, t, step),
        FrequencyLabel::Quarterly => month_block(calendar, t, 3 * step),
        FrequencyLabel::Yearly => year_block(calendar, t, step),
        FrequencyLabel::Decadal => year_block(calendar, t, 10 * step),
        FrequencyLabel::Weekly => Ok(day_block(calendar, t, 7 * step)),
        FrequencyLabel::Daily => Ok(day_block(calendar, t, step)),
        FrequencyLabel::SubDaily => {
            let size = 3_600 * step;
            let seconds = calendar.seconds_from_epoch(t);
            Ok(calendar.datetime_from_seconds(seconds - seconds.rem_euclid(size)))
        }
    }
}

fn month_block(calendar: Calendar, t: &CfDatetime, step_months: i64) -> Result<CfDatetime> {
    let months = t.year * 12 + i64::from(t.month) - 1;
    let block = months - months.rem_euclid(step_months);
    Ok(CfDatetime::from_ymd(
        block.div_euclid(12),
        (block.rem_euclid(12) + 1) as u32,
        1,
        calendar,
    )?)
}

fn year_block(calendar: Calendar, t: &CfDatetime, step_years: i64) -> Result<CfDatetime> {
    let year = t.year - t.year.rem_euclid(step_years);
    Ok(CfDatetime::from_ymd(year, 1, 1, calendar)?)
}

fn day_block(calendar: Calendar, t: &CfDatetime, step_days: i64) -> CfDatetime {
    let day = calendar.day_number(t);
    calendar.date_from_day_number(day - day.rem_euclid(step_days))
}
