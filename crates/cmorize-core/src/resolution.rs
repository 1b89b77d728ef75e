use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TimeError};
use crate::frequency::{infer_frequency, FrequencyVerdict, InferOptions};
use crate::time_axis::TimeAxis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionRelation {
    /// Inferred and target intervals agree within tolerance.
    Equal,
    /// Data is higher resolution than the target (safe downsampling).
    Finer,
    /// Data is lower resolution than the target (would be upsampling).
    Coarser,
}

impl ResolutionRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionRelation::Equal => "equal",
            ResolutionRelation::Finer => "finer",
            ResolutionRelation::Coarser => "coarser",
        }
    }
}

/// Verdict of a resolution check; computed on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionCheck {
    pub relation: ResolutionRelation,
    pub inferred_interval_days: f64,
    pub target_interval_days: f64,
    pub is_valid_for_resampling: bool,
    pub verdict: FrequencyVerdict,
}

impl ResolutionCheck {
    /// JSON form for pipeline-side persistence of check results.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decides whether resampling the axis to `target_interval_days` is valid:
/// equal or finer data passes, coarser data would require fabricating
/// values and is rejected. Under strict inference, a cadence with missing
/// steps also fails the check, since bucket means over holes are not
/// representative.
pub fn check_resolution(
    axis: &TimeAxis,
    target_interval_days: f64,
    options: &InferOptions,
) -> Result<ResolutionCheck> {
    if !target_interval_days.is_finite() || target_interval_days <= 0.0 {
        return Err(TimeError::InvalidFrequency(format!(
            "target interval of {target_interval_days} days"
        )));
    }

    let verdict = infer_frequency(axis, options)?;
    let inferred = verdict.interval_days();

    let relation = if (inferred - target_interval_days).abs()
        <= options.tolerance * target_interval_days
    {
        ResolutionRelation::Equal
    } else if inferred < target_interval_days {
        ResolutionRelation::Finer
    } else {
        ResolutionRelation::Coarser
    };

    let mut is_valid = relation != ResolutionRelation::Coarser;
    if matches!(verdict, FrequencyVerdict::MissingSteps(_)) {
        warn!(
            inferred_interval_days = inferred,
            "axis has missing steps; refusing to treat it as resamplable"
        );
        is_valid = false;
    }

    debug!(
        relation = relation.as_str(),
        inferred_interval_days = inferred,
        target_interval_days,
        is_valid,
        "resolution check"
    );

    Ok(ResolutionCheck {
        relation,
        inferred_interval_days: inferred,
        target_interval_days,
        is_valid_for_resampling: is_valid,
        verdict,
    })
}
