pub mod bounds;
pub mod dataset;
pub mod error;
pub mod frequency;
pub mod resample;
pub mod resolution;
pub mod rule;
pub mod time_axis;

pub use bounds::{time_bounds, PointConvention, TimeMethod};
pub use dataset::Dataset;
pub use error::{Result, TimeError};
pub use frequency::{
    infer_frequency, FrequencyEstimate, FrequencyLabel, FrequencyVerdict, InferOptions,
    DEFAULT_TOLERANCE,
};
pub use resample::{resample_safe, FreqSpec, ResampleMethod, ResampleOptions};
pub use resolution::{check_resolution, ResolutionCheck, ResolutionRelation};
pub use rule::Rule;
pub use time_axis::{TimeAxis, TimeEncoding};

pub use cmorize_calendar::{Calendar, CalendarError, CfDatetime, TimeUnits};
