use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cmorize_calendar::CfDatetime;

use crate::dataset::Dataset;
use crate::error::{Result, TimeError};
use crate::frequency::median;
use crate::rule::Rule;
use crate::time_axis::TimeAxis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMethod {
    /// Instantaneous values; bounds have zero width.
    #[serde(alias = "instantaneous")]
    Point,
    /// Interval means; bounds span the averaging interval.
    Mean,
    /// Climatological statistics; bounds span the averaging interval.
    Climatology,
}

impl TimeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeMethod::Point => "point",
            TimeMethod::Mean => "mean",
            TimeMethod::Climatology => "climatology",
        }
    }
}

impl TryFrom<&str> for TimeMethod {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "point" | "instantaneous" => Ok(TimeMethod::Point),
            "mean" => Ok(TimeMethod::Mean),
            "climatology" => Ok(TimeMethod::Climatology),
            other => Err(format!("unknown time method '{other}'")),
        }
    }
}

/// Where a time point sits within its averaging interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointConvention {
    Start,
    Middle,
    End,
}

// Natural calendar units the approximate interval can snap to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NaturalUnit {
    Month,
    Year,
}

/// Computes and attaches time bounds according to the time method and the
/// approximate interval, leaving well-formed pre-existing bounds untouched.
///
/// Bounds derived here from the source's native per-step timestamps are
/// snap-accurate; bounds computed after aggregation, from only the reduced
/// representative timestamp, are approximate when that point is the
/// interval middle or end. That inaccuracy is accepted, not repaired.
pub fn time_bounds(mut ds: Dataset, rule: &Rule) -> Result<Dataset> {
    let dataset_name = ds.attr("name").unwrap_or("unnamed_dataset").to_string();
    let axis = TimeAxis::from_dataset(&ds, rule.calendar)?;
    let bounds_name = format!("{}_bnds", axis.label());

    info!(
        dataset = dataset_name.as_str(),
        time_label = axis.label(),
        bounds_label = bounds_name.as_str(),
        "setting time bounds"
    );

    if let Some(existing) = ds.bounds_var(&bounds_name) {
        if bounds_well_formed(existing, ds.height()) {
            info!(bounds = bounds_name.as_str(), "existing bounds preserved");
            return Ok(ds);
        }
        warn!(
            bounds = bounds_name.as_str(),
            "existing bounds are malformed; recomputing"
        );
    }

    if axis.len() < 2 {
        return Err(TimeError::InsufficientTimePoints {
            needed: 2,
            found: axis.len(),
        });
    }
    axis.ensure_valid()?;

    let method = effective_time_method(&ds, rule);
    debug!(
        method = method.as_str(),
        approx_interval = rule.approx_interval,
        "time bounds decision"
    );

    let (lower, upper) = match method {
        TimeMethod::Point => {
            let values = axis.values().to_vec();
            (values.clone(), values)
        }
        TimeMethod::Mean | TimeMethod::Climatology => {
            let pairs = mean_bounds(&axis, rule)?;
            report_contiguity(&pairs);
            pairs
        }
    };

    let lower_col = axis.encode_column("lower", &lower)?;
    let upper_col = axis.encode_column("upper", &upper)?;
    let bounds_frame = DataFrame::new(vec![lower_col.into(), upper_col.into()])?;

    let time_label = axis.label().to_string();
    ds.set_bounds_var(&bounds_name, bounds_frame);
    ds.set_var_attr(
        &bounds_name,
        "long_name",
        format!("time bounds for {time_label}"),
    );
    // Bounds share the time coordinate's encoding metadata.
    for key in ["units", "calendar"] {
        if let Some(value) = ds.var_attr(&time_label, key).map(str::to_string) {
            ds.set_var_attr(&bounds_name, key, value);
        }
    }
    if ds.var_attr(&time_label, "bounds").is_none() {
        ds.set_var_attr(&time_label, "bounds", &bounds_name);
    }

    info!(
        bounds = bounds_name.as_str(),
        first = %lower[0],
        last = %upper[upper.len() - 1],
        "set time bounds"
    );
    Ok(ds)
}

fn effective_time_method(ds: &Dataset, rule: &Rule) -> TimeMethod {
    if let Some(method) = rule.time_method {
        return method;
    }
    if let Some(raw) = ds.attr("time_method") {
        match TimeMethod::try_from(raw) {
            Ok(method) => return method,
            Err(_) => warn!(time_method = raw, "unknown time method, defaulting to mean"),
        }
    }
    TimeMethod::Mean
}

fn mean_bounds(axis: &TimeAxis, rule: &Rule) -> Result<(Vec<CfDatetime>, Vec<CfDatetime>)> {
    let calendar = axis.calendar();
    let interval = match rule.approx_interval.filter(|days| *days > 0.0) {
        Some(days) => days,
        None => {
            let inferred = median(&axis.deltas_days());
            debug!(
                interval_days = inferred,
                "no approximate interval configured, using the inferred median delta"
            );
            inferred
        }
    };

    let unit = natural_unit(interval);
    let convention = rule
        .convention
        .unwrap_or_else(|| detect_convention(axis, unit));
    debug!(
        interval_days = interval,
        convention = ?convention,
        natural_unit = ?unit,
        "mean bounds"
    );

    let mut lower = Vec::with_capacity(axis.len());
    let mut upper = Vec::with_capacity(axis.len());
    for value in axis.values() {
        let (low, high) = match (convention, unit) {
            (PointConvention::Start, Some(NaturalUnit::Month)) => (
                calendar.start_of_month(value),
                calendar.start_of_next_month(value),
            ),
            (PointConvention::Start, Some(NaturalUnit::Year)) => (
                calendar.start_of_year(value),
                calendar.start_of_next_year(value),
            ),
            (PointConvention::Start, None) => (*value, calendar.add_days(value, interval)),
            (PointConvention::Middle, natural) => {
                let raw_low = calendar.add_days(value, -interval / 2.0);
                let raw_high = calendar.add_days(value, interval / 2.0);
                match natural {
                    Some(NaturalUnit::Month) => (
                        calendar.nearest_month_start(&raw_low),
                        calendar.nearest_month_start(&raw_high),
                    ),
                    Some(NaturalUnit::Year) => (
                        calendar.nearest_year_start(&raw_low),
                        calendar.nearest_year_start(&raw_high),
                    ),
                    None => (raw_low, raw_high),
                }
            }
            (PointConvention::End, _) => (calendar.add_days(value, -interval), *value),
        };
        lower.push(low);
        upper.push(high);
    }
    Ok((lower, upper))
}

fn natural_unit(interval_days: f64) -> Option<NaturalUnit> {
    if (28.0..=32.0).contains(&interval_days) {
        Some(NaturalUnit::Month)
    } else if (360.0..=370.0).contains(&interval_days) {
        Some(NaturalUnit::Year)
    } else {
        None
    }
}

/// Infers where the points sit within their natural buckets from the median
/// in-bucket position fraction. Without a natural unit the points are taken
/// to mark interval starts.
fn detect_convention(axis: &TimeAxis, unit: Option<NaturalUnit>) -> PointConvention {
    let Some(unit) = unit else {
        return PointConvention::Start;
    };
    let calendar = axis.calendar();
    let fractions: Vec<f64> = axis
        .values()
        .iter()
        .map(|value| {
            let (start, end) = match unit {
                NaturalUnit::Month => (
                    calendar.start_of_month(value),
                    calendar.start_of_next_month(value),
                ),
                NaturalUnit::Year => (
                    calendar.start_of_year(value),
                    calendar.start_of_next_year(value),
                ),
            };
            calendar.days_between(&start, value) / calendar.days_between(&start, &end)
        })
        .collect();
    let position = median(&fractions);
    if position <= 0.25 {
        PointConvention::Start
    } else if position >= 0.75 {
        PointConvention::End
    } else {
        PointConvention::Middle
    }
}

fn report_contiguity(pairs: &(Vec<CfDatetime>, Vec<CfDatetime>)) {
    let (lower, upper) = pairs;
    let violations = (1..lower.len())
        .filter(|&idx| upper[idx - 1] != lower[idx])
        .count();
    if violations > 0 {
        warn!(violations, "time bounds are not contiguous");
    }
}

fn bounds_well_formed(frame: &DataFrame, expected_height: usize) -> bool {
    if frame.height() != expected_height {
        return false;
    }
    let (Some(lower), Some(upper)) = (numeric_view(frame, "lower"), numeric_view(frame, "upper"))
    else {
        return false;
    };
    lower.iter().zip(upper.iter()).all(|(low, high)| low <= high)
}

fn numeric_view(frame: &DataFrame, name: &str) -> Option<Vec<f64>> {
    let series = frame.column(name).ok()?.as_materialized_series();
    let series = match series.dtype() {
        DataType::Datetime(_, _) | DataType::Date => series
            .cast(&DataType::Int64)
            .ok()?
            .cast(&DataType::Float64)
            .ok()?,
        _ => series.cast(&DataType::Float64).ok()?,
    };
    let values = series.f64().ok()?;
    let mut out = Vec::with_capacity(values.len());
    for idx in 0..values.len() {
        out.push(values.get(idx)?);
    }
    Some(out)
}
