use std::collections::HashMap;

use polars::prelude::*;

use cmorize_calendar::TimeUnits;

use crate::error::{Result, TimeError};
use crate::frequency::{FrequencyVerdict, InferOptions};
use crate::resample::{FreqSpec, ResampleOptions};
use crate::resolution::ResolutionCheck;
use crate::rule::Rule;
use crate::time_axis::TimeAxis;

/// Adapter over the host table structure: a polars DataFrame plus the
/// attribute and bounds metadata a CF dataset carries but a plain frame
/// cannot. Bounds variables are stored as two-column frames (`lower`,
/// `upper`) keyed by name, since a DataFrame has no second dimension.
///
/// The core never retains references across calls; operations consume the
/// dataset and return a new or augmented one.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    attrs: HashMap<String, String>,
    var_attrs: HashMap<String, HashMap<String, String>>,
    bounds: HashMap<String, DataFrame>,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Result<Self> {
        if frame.width() == 0 {
            return Err(TimeError::NotADataset(
                "the frame has no variables".to_string(),
            ));
        }
        Ok(Self {
            frame,
            attrs: HashMap::new(),
            var_attrs: HashMap::new(),
            bounds: HashMap::new(),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn attrs(&self) -> &HashMap<String, String> {
        &self.attrs
    }

    pub fn var_attr(&self, variable: &str, key: &str) -> Option<&str> {
        self.var_attrs
            .get(variable)
            .and_then(|attrs| attrs.get(key))
            .map(String::as_str)
    }

    pub fn set_var_attr(
        &mut self,
        variable: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.var_attrs
            .entry(variable.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn var_attrs(&self, variable: &str) -> Option<&HashMap<String, String>> {
        self.var_attrs.get(variable)
    }

    pub fn bounds_var(&self, name: &str) -> Option<&DataFrame> {
        self.bounds.get(name)
    }

    pub fn set_bounds_var(&mut self, name: impl Into<String>, frame: DataFrame) {
        self.bounds.insert(name.into(), frame);
    }

    /// Name of the coordinate that can serve as the time label: a
    /// datetime-typed column, or a numeric column whose `units` attribute
    /// is a CF time-units string. A column literally named `time` wins over
    /// other candidates.
    pub fn time_label(&self) -> Option<&str> {
        let mut fallback = None;
        for column in self.frame.get_columns() {
            let name = column.name().as_str();
            if !self.is_time_like(name, column.dtype()) {
                continue;
            }
            if name == "time" {
                return Some(name);
            }
            if fallback.is_none() {
                fallback = Some(name);
            }
        }
        fallback
    }

    pub fn has_time_axis(&self) -> bool {
        self.time_label().is_some()
    }

    fn is_time_like(&self, name: &str, dtype: &DataType) -> bool {
        match dtype {
            DataType::Datetime(_, _) | DataType::Date => true,
            dtype if is_numeric_dtype(dtype) => self
                .var_attr(name, "units")
                .is_some_and(TimeUnits::is_time_units),
            _ => false,
        }
    }

    /// Whether the axis spans more than one target interval, i.e. whether a
    /// time-averaging step would actually reduce anything. Datasets without
    /// a usable time axis never need resampling.
    pub fn needs_resampling(&self, spec: &FreqSpec) -> bool {
        let Ok(axis) = TimeAxis::from_dataset(self, None) else {
            return false;
        };
        if axis.len() < 2 {
            return false;
        }
        axis.span_days() > spec.interval_days(axis.calendar())
    }

    // Unified accessor surface, delegating to the specialized modules.

    pub fn infer_frequency(&self, options: &InferOptions) -> Result<FrequencyVerdict> {
        let axis = TimeAxis::from_dataset(self, options.calendar)?;
        crate::frequency::infer_frequency(&axis, options)
    }

    pub fn check_resolution(
        &self,
        target_interval_days: f64,
        options: &InferOptions,
    ) -> Result<ResolutionCheck> {
        let axis = TimeAxis::from_dataset(self, options.calendar)?;
        crate::resolution::check_resolution(&axis, target_interval_days, options)
    }

    pub fn resample_safe(self, options: &ResampleOptions) -> Result<Dataset> {
        crate::resample::resample_safe(self, options)
    }

    pub fn time_bounds(self, rule: &Rule) -> Result<Dataset> {
        crate::bounds::time_bounds(self, rule)
    }
}

pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
    )
}
