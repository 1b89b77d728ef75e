use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cmorize_calendar::Calendar;

use crate::error::{Result, TimeError};
use crate::time_axis::TimeAxis;

/// Relative tolerance for delta comparisons.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Fallback tolerance for classifying visibly irregular series; a match
/// found only at this tolerance is never reported as regular.
const RELAXED_TOLERANCE: f64 = 0.5;

const MAX_STEP: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyLabel {
    SubDaily,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    Decadal,
}

impl FrequencyLabel {
    /// Match order matters: the first (finest) unit whose step multiple
    /// fits the median delta wins, so a 7-day cadence reports as `7D`.
    pub const ALL: [FrequencyLabel; 7] = [
        FrequencyLabel::SubDaily,
        FrequencyLabel::Daily,
        FrequencyLabel::Weekly,
        FrequencyLabel::Monthly,
        FrequencyLabel::Quarterly,
        FrequencyLabel::Yearly,
        FrequencyLabel::Decadal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyLabel::SubDaily => "subdaily",
            FrequencyLabel::Daily => "daily",
            FrequencyLabel::Weekly => "weekly",
            FrequencyLabel::Monthly => "monthly",
            FrequencyLabel::Quarterly => "quarterly",
            FrequencyLabel::Yearly => "yearly",
            FrequencyLabel::Decadal => "decadal",
        }
    }

    pub fn unit_code(&self) -> &'static str {
        match self {
            FrequencyLabel::SubDaily => "H",
            FrequencyLabel::Daily => "D",
            FrequencyLabel::Weekly => "W",
            FrequencyLabel::Monthly => "M",
            FrequencyLabel::Quarterly => "Q",
            FrequencyLabel::Yearly => "A",
            FrequencyLabel::Decadal => "10A",
        }
    }

    /// Nominal length of one unit in days under the given calendar.
    pub fn base_days(&self, calendar: Calendar) -> f64 {
        let year = calendar.mean_year_days();
        match self {
            FrequencyLabel::SubDaily => 1.0 / 24.0,
            FrequencyLabel::Daily => 1.0,
            FrequencyLabel::Weekly => 7.0,
            FrequencyLabel::Monthly => year / 12.0,
            FrequencyLabel::Quarterly => year / 4.0,
            FrequencyLabel::Yearly => year,
            FrequencyLabel::Decadal => year * 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEstimate {
    pub label: FrequencyLabel,
    /// Step multiplier: 2 for two-daily ("2D"), 1 for plain units.
    pub step: u32,
    /// Median observed delta in days.
    pub interval_days: f64,
    /// Compact code such as "M", "2D", "7D".
    pub code: String,
}

/// Outcome of a frequency inference. The variants force callers to handle
/// ambiguity explicitly; there is no regular-looking default to fall into.
/// A verdict is computed fresh on every call and never cached, since the
/// underlying data may change between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrequencyVerdict {
    /// Deltas are consistent within tolerance.
    Regular(FrequencyEstimate),
    /// Best-guess bucket; spacing is too uneven to trust (non-strict only).
    Irregular(FrequencyEstimate),
    /// The cadence is consistent but samples are missing (strict only).
    MissingSteps(FrequencyEstimate),
    /// The median delta matches no nominal frequency at all.
    Unknown { interval_days: f64 },
}

impl FrequencyVerdict {
    pub fn estimate(&self) -> Option<&FrequencyEstimate> {
        match self {
            FrequencyVerdict::Regular(estimate)
            | FrequencyVerdict::Irregular(estimate)
            | FrequencyVerdict::MissingSteps(estimate) => Some(estimate),
            FrequencyVerdict::Unknown { .. } => None,
        }
    }

    pub fn interval_days(&self) -> f64 {
        match self {
            FrequencyVerdict::Regular(estimate)
            | FrequencyVerdict::Irregular(estimate)
            | FrequencyVerdict::MissingSteps(estimate) => estimate.interval_days,
            FrequencyVerdict::Unknown { interval_days } => *interval_days,
        }
    }

    pub fn is_regular(&self) -> bool {
        matches!(self, FrequencyVerdict::Regular(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InferOptions {
    /// Fail with `FrequencyAmbiguous` instead of returning a best guess.
    pub strict: bool,
    /// Relative tolerance for delta comparisons.
    pub tolerance: f64,
    /// Calendar to assume when the axis metadata does not name one.
    pub calendar: Option<Calendar>,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            strict: false,
            tolerance: DEFAULT_TOLERANCE,
            calendar: None,
        }
    }
}

/// Infers the nominal sampling frequency of a time axis from the median of
/// its consecutive day deltas.
pub fn infer_frequency(axis: &TimeAxis, options: &InferOptions) -> Result<FrequencyVerdict> {
    if axis.len() < 2 {
        return Err(TimeError::InsufficientTimePoints {
            needed: 2,
            found: axis.len(),
        });
    }
    axis.ensure_valid()?;

    let deltas = axis.deltas_days();
    let median = median(&deltas);
    let spread = std_dev(&deltas);
    let calendar = axis.calendar();

    let matched = match_nominal(median, calendar, options.tolerance)
        .or_else(|| match_nominal(median, calendar, RELAXED_TOLERANCE));
    let Some((label, step, matched_days)) = matched else {
        if options.strict {
            return Err(TimeError::FrequencyAmbiguous(format!(
                "median delta of {median:.3} days matches no nominal frequency"
            )));
        }
        debug!(median_delta_days = median, "no nominal frequency matched");
        return Ok(FrequencyVerdict::Unknown {
            interval_days: median,
        });
    };

    let estimate = FrequencyEstimate {
        label,
        step,
        interval_days: median,
        code: frequency_code(label, step),
    };
    let spread_ok = spread < options.tolerance * matched_days;

    if options.strict {
        // A whole missing sample shows up as a mismatch between the span
        // in nominal steps and the actual number of steps.
        let expected_steps = axis.span_days() / matched_days;
        let actual_steps = (axis.len() - 1) as f64;
        if (expected_steps - actual_steps).abs() >= 1.0 {
            warn!(
                code = estimate.code.as_str(),
                expected = expected_steps,
                actual = actual_steps,
                "cadence is consistent but steps are missing"
            );
            return Ok(FrequencyVerdict::MissingSteps(estimate));
        }
        let uneven = deltas
            .iter()
            .any(|delta| (delta - median).abs() > options.tolerance * median);
        if uneven || !spread_ok {
            return Err(TimeError::FrequencyAmbiguous(format!(
                "deltas vary beyond {:.1}% around the median of {median:.3} days",
                options.tolerance * 100.0
            )));
        }
        return Ok(FrequencyVerdict::Regular(estimate));
    }

    debug!(
        code = estimate.code.as_str(),
        median_delta_days = median,
        regular = spread_ok,
        "inferred frequency"
    );
    Ok(if spread_ok {
        FrequencyVerdict::Regular(estimate)
    } else {
        FrequencyVerdict::Irregular(estimate)
    })
}

fn match_nominal(
    median: f64,
    calendar: Calendar,
    tolerance: f64,
) -> Option<(FrequencyLabel, u32, f64)> {
    for label in FrequencyLabel::ALL {
        let base = label.base_days(calendar);
        for step in 1..=MAX_STEP {
            let test = base * f64::from(step);
            if (median - test).abs() <= tolerance * test {
                return Some((label, step, test));
            }
        }
    }
    None
}

pub(crate) fn frequency_code(label: FrequencyLabel, step: u32) -> String {
    if step > 1 {
        format!("{step}{}", label.unit_code())
    } else {
        label.unit_code().to_string()
    }
}

pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / n;
    variance.sqrt()
}
