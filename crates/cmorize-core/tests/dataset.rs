use chrono::{NaiveDate, NaiveDateTime};
use cmorize_core::{Dataset, FreqSpec, InferOptions, TimeError};
use polars::df;
use polars::lazy::dsl::col;
use polars::prelude::*;

fn naive_to_micros(dt: NaiveDateTime) -> i64 {
    let dt_utc = dt.and_utc();
    dt_utc.timestamp() * 1_000_000 + i64::from(dt_utc.timestamp_subsec_nanos() / 1_000)
}

fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight")
}

fn datetime_frame(label: &str, times: &[NaiveDateTime]) -> DataFrame {
    let micros: Vec<i64> = times.iter().copied().map(naive_to_micros).collect();
    df![
        label => micros,
        "tas" => vec![1.0; times.len()],
    ]
    .expect("frame")
    .lazy()
    .with_column(col(label).cast(DataType::Datetime(TimeUnit::Microseconds, None)))
    .collect()
    .expect("collect")
}

#[test]
fn an_empty_frame_is_not_a_dataset() {
    let err = Dataset::new(DataFrame::empty()).expect_err("must fail");
    assert!(matches!(err, TimeError::NotADataset(_)));
}

#[test]
fn detects_a_datetime_column_as_the_time_label() {
    let times: Vec<NaiveDateTime> = (1..=3).map(|day| midnight(2000, 1, day)).collect();
    let ds = Dataset::new(datetime_frame("time", &times)).expect("dataset");
    assert_eq!(ds.time_label(), Some("time"));
    assert!(ds.has_time_axis());
}

#[test]
fn detects_an_unconventionally_named_time_column() {
    let times: Vec<NaiveDateTime> = (1..=3).map(|day| midnight(2000, 1, day)).collect();
    let ds = Dataset::new(datetime_frame("T", &times)).expect("dataset");
    assert_eq!(ds.time_label(), Some("T"));
}

#[test]
fn a_column_named_time_wins_over_other_candidates() {
    let times: Vec<NaiveDateTime> = (1..=3).map(|day| midnight(2000, 1, day)).collect();
    let micros: Vec<i64> = times.iter().copied().map(naive_to_micros).collect();
    let frame = df![
        "valid_at" => micros.clone(),
        "time" => micros,
        "tas" => vec![1.0; 3],
    ]
    .expect("frame")
    .lazy()
    .with_column(col("valid_at").cast(DataType::Datetime(TimeUnit::Microseconds, None)))
    .with_column(col("time").cast(DataType::Datetime(TimeUnit::Microseconds, None)))
    .collect()
    .expect("collect");
    let ds = Dataset::new(frame).expect("dataset");
    assert_eq!(ds.time_label(), Some("time"));
}

#[test]
fn numeric_columns_need_cf_units_to_count_as_time() {
    let frame = df!["time" => vec![1.0, 2.0, 3.0], "tas" => vec![1.0, 2.0, 3.0]]
        .expect("frame");
    let mut ds = Dataset::new(frame).expect("dataset");
    assert_eq!(ds.time_label(), None);
    assert!(!ds.has_time_axis());

    ds.set_var_attr("time", "units", "days since 2000-01-01");
    assert_eq!(ds.time_label(), Some("time"));
}

#[test]
fn datetime_axes_reject_non_gregorian_calendars() {
    let times: Vec<NaiveDateTime> = (1..=3).map(|day| midnight(2000, 1, day)).collect();
    let mut ds = Dataset::new(datetime_frame("time", &times)).expect("dataset");
    ds.set_var_attr("time", "calendar", "360_day");

    let err = ds
        .infer_frequency(&InferOptions::default())
        .expect_err("must fail");
    assert!(matches!(err, TimeError::InconsistentCalendar(_)));
}

#[test]
fn unknown_calendar_names_are_unsupported() {
    let frame = df!["time" => vec![0.0, 1.0], "tas" => vec![1.0, 2.0]].expect("frame");
    let mut ds = Dataset::new(frame).expect("dataset");
    ds.set_var_attr("time", "units", "days since 2000-01-01");
    ds.set_var_attr("time", "calendar", "lunar");

    let err = ds
        .infer_frequency(&InferOptions::default())
        .expect_err("must fail");
    assert!(matches!(
        err,
        TimeError::Calendar(cmorize_core::CalendarError::UnsupportedKind(_))
    ));
}

#[test]
fn needs_resampling_compares_the_span_to_the_target() {
    let frame = df![
        "time" => (0..12).map(|month| 14.0 + 30.0 * f64::from(month)).collect::<Vec<f64>>(),
        "tas" => vec![1.0; 12],
    ]
    .expect("frame");
    let mut ds = Dataset::new(frame).expect("dataset");
    ds.set_var_attr("time", "units", "days since 2000-01-01");
    ds.set_var_attr("time", "calendar", "360_day");

    // Eleven months of span: more than a quarter, less than a year.
    assert!(ds.needs_resampling(&FreqSpec::parse("Q").expect("spec")));
    assert!(!ds.needs_resampling(&FreqSpec::parse("A").expect("spec")));
}

#[test]
fn needs_resampling_is_false_without_a_time_axis() {
    let frame = df!["x" => vec![1.0, 2.0], "y" => vec![3.0, 4.0]].expect("frame");
    let ds = Dataset::new(frame).expect("dataset");
    assert!(!ds.needs_resampling(&FreqSpec::parse("M").expect("spec")));
}

#[test]
fn the_time_axis_exposes_its_decoded_form() {
    use cmorize_core::{Calendar, TimeAxis, TimeEncoding};

    let frame = df![
        "time" => vec![0.0, 30.0, 60.0],
        "tas" => vec![1.0, 2.0, 3.0],
    ]
    .expect("frame");
    let mut ds = Dataset::new(frame).expect("dataset");
    ds.set_var_attr("time", "units", "days since 2000-01-01");
    ds.set_var_attr("time", "calendar", "360_day");

    let axis = TimeAxis::from_dataset(&ds, None).expect("axis");
    assert_eq!(axis.label(), "time");
    assert_eq!(axis.calendar(), Calendar::Day360);
    assert!(matches!(axis.encoding(), TimeEncoding::Numeric(_)));
    assert_eq!(axis.len(), 3);
    assert!(!axis.is_empty());
    assert_eq!(axis.span_days(), 60.0);
    assert_eq!(axis.deltas_days(), vec![30.0, 30.0]);
    assert_eq!(axis.values()[1].to_string(), "2000-02-01T00:00:00");
    axis.ensure_valid().expect("valid axis");
}

#[test]
fn attributes_round_trip() {
    let frame = df!["tas" => vec![1.0]].expect("frame");
    let mut ds = Dataset::new(frame).expect("dataset");
    ds.set_attr("name", "tas_day");
    ds.set_var_attr("tas", "units", "K");

    assert_eq!(ds.attr("name"), Some("tas_day"));
    assert_eq!(ds.var_attr("tas", "units"), Some("K"));
    assert_eq!(ds.attr("missing"), None);
    assert_eq!(ds.var_attr("tas", "missing"), None);

    let frame = ds.into_frame();
    assert_eq!(frame.height(), 1);
}
