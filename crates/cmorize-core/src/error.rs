// crates/cmorize-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeError {
    #[error("the input is not a dataset: {0}")]
    NotADataset(String),

    #[error("the dataset does not contain a valid time coordinate")]
    NoTimeCoordinate,

    #[error("not enough time points: need at least {needed}, found {found}")]
    InsufficientTimePoints { needed: usize, found: usize },

    #[error("degenerate time axis: {0}")]
    DegenerateTimeAxis(String),

    #[error("inconsistent calendar: {0}")]
    InconsistentCalendar(String),

    #[error("frequency is ambiguous under strict inference: {0}")]
    FrequencyAmbiguous(String),

    #[error("unsafe resampling: {0}")]
    UnsafeResampling(String),

    #[error("unrecognized frequency specification '{0}'")]
    InvalidFrequency(String),

    #[error("calendar error: {0}")]
    Calendar(#[from] cmorize_calendar::CalendarError),

    #[error("polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid rule configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TimeError>;
