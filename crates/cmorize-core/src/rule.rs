use serde::{Deserialize, Serialize};

use cmorize_calendar::Calendar;

use crate::bounds::{PointConvention, TimeMethod};
use crate::error::Result;
use crate::frequency::{InferOptions, DEFAULT_TOLERANCE};

/// Per-variable configuration handed in by the surrounding pipeline: the
/// approximate interval and time method come from the external
/// standard-name table, the rest are optional overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Nominal interval length in days (e.g. 30.0 for monthly output).
    pub approx_interval: Option<f64>,
    /// Falls back to the dataset's `time_method` attribute, then to `mean`.
    pub time_method: Option<TimeMethod>,
    /// Calendar to assume when the axis metadata does not name one.
    pub calendar: Option<Calendar>,
    /// Explicit target frequency ("M", "2D"); overrides interval-derived
    /// targets when resampling.
    pub frequency: Option<String>,
    /// Pinned time-point convention; auto-detected when absent.
    pub convention: Option<PointConvention>,
    pub strict: bool,
    pub tolerance: f64,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            approx_interval: None,
            time_method: None,
            calendar: None,
            frequency: None,
            convention: None,
            strict: false,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Rule {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    pub fn infer_options(&self) -> InferOptions {
        InferOptions {
            strict: self.strict,
            tolerance: self.tolerance,
            calendar: self.calendar,
        }
    }
}
