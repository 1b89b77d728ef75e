use chrono::NaiveDateTime;
use cmorize_core::{Dataset, FrequencyLabel, FrequencyVerdict, InferOptions, TimeError};
use polars::df;
use polars::lazy::dsl::col;
use polars::prelude::*;

fn cf_dataset(time_values: &[f64], calendar: &str) -> Dataset {
    let frame = df![
        "time" => time_values.to_vec(),
        "tas" => vec![1.0; time_values.len()],
    ]
    .expect("frame");
    let mut ds = Dataset::new(frame).expect("dataset");
    ds.set_var_attr("time", "units", "days since 2000-01-01");
    ds.set_var_attr("time", "calendar", calendar);
    ds
}

fn parse_naive(ts: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").expect("parse timestamp")
}

fn naive_to_micros(dt: NaiveDateTime) -> i64 {
    let dt_utc = dt.and_utc();
    dt_utc.timestamp() * 1_000_000 + i64::from(dt_utc.timestamp_subsec_nanos() / 1_000)
}

fn datetime_dataset(times: &[NaiveDateTime]) -> Dataset {
    let micros: Vec<i64> = times.iter().copied().map(naive_to_micros).collect();
    let frame = df![
        "time" => micros,
        "tas" => vec![1.0; times.len()],
    ]
    .expect("frame")
    .lazy()
    .with_column(col("time").cast(DataType::Datetime(TimeUnit::Microseconds, None)))
    .collect()
    .expect("collect");
    Dataset::new(frame).expect("dataset")
}

// Months 1..=4 of year 2000 at day 15 in the 360-day calendar.
fn regular_monthly_time() -> Vec<f64> {
    (0..4).map(|month| 14.0 + 30.0 * f64::from(month)).collect()
}

#[test]
fn infers_monthly_frequency() {
    let ds = cf_dataset(&regular_monthly_time(), "360_day");
    let verdict = ds
        .infer_frequency(&InferOptions::default())
        .expect("inference");

    let FrequencyVerdict::Regular(estimate) = verdict else {
        panic!("expected a regular verdict, got {verdict:?}");
    };
    assert_eq!(estimate.label, FrequencyLabel::Monthly);
    assert_eq!(estimate.label.as_str(), "monthly");
    assert_eq!(estimate.code, "M");
    assert_eq!(estimate.step, 1);
    assert_eq!(estimate.interval_days, 30.0);
}

#[test]
fn irregular_series_yields_best_guess() {
    // Jan 1, Jan 20, Feb 15, Mar 10 in the 360-day calendar.
    let ds = cf_dataset(&[0.0, 19.0, 44.0, 69.0], "360_day");
    let verdict = ds
        .infer_frequency(&InferOptions::default())
        .expect("inference");

    assert!(matches!(verdict, FrequencyVerdict::Irregular(_)));
    assert!(!verdict.is_regular());
    assert!(verdict.estimate().is_some());
}

#[test]
fn single_point_is_insufficient() {
    let ds = cf_dataset(&[0.0], "360_day");
    let err = ds
        .infer_frequency(&InferOptions::default())
        .expect_err("must fail");
    assert!(matches!(
        err,
        TimeError::InsufficientTimePoints { needed: 2, found: 1 }
    ));
}

#[test]
fn duplicate_timestamps_are_degenerate() {
    let ds = cf_dataset(&[0.0, 0.0], "360_day");
    let err = ds
        .infer_frequency(&InferOptions::default())
        .expect_err("must fail");
    assert!(matches!(err, TimeError::DegenerateTimeAxis(_)));
}

#[test]
fn decreasing_timestamps_are_degenerate() {
    let ds = cf_dataset(&[0.0, 5.0, 3.0], "360_day");
    let err = ds
        .infer_frequency(&InferOptions::default())
        .expect_err("must fail");
    assert!(matches!(err, TimeError::DegenerateTimeAxis(_)));
}

#[test]
fn strict_mode_flags_daily_gaps_as_missing_steps() {
    // Days 1, 2, 3, 7, 8: a three-day hole in a daily cadence.
    let ds = cf_dataset(&[0.0, 1.0, 2.0, 6.0, 7.0], "360_day");
    let options = InferOptions {
        strict: true,
        ..InferOptions::default()
    };
    let verdict = ds.infer_frequency(&options).expect("inference");

    let FrequencyVerdict::MissingSteps(estimate) = verdict else {
        panic!("expected missing steps, got {verdict:?}");
    };
    assert_eq!(estimate.code, "D");
    assert_eq!(estimate.step, 1);
}

#[test]
fn weekly_gaps_report_a_seven_day_cadence() {
    // Weeks 1, 2, 4, 5: the daily unit at step 7 matches first.
    let ds = cf_dataset(&[0.0, 7.0, 21.0, 28.0], "360_day");
    let options = InferOptions {
        strict: true,
        ..InferOptions::default()
    };
    let verdict = ds.infer_frequency(&options).expect("inference");

    let FrequencyVerdict::MissingSteps(estimate) = verdict else {
        panic!("expected missing steps, got {verdict:?}");
    };
    assert_eq!(estimate.code, "7D");
    assert_eq!(estimate.step, 7);
    assert_eq!(estimate.label, FrequencyLabel::Daily);
}

#[test]
fn missing_step_detection_requires_strict_mode() {
    let ds = cf_dataset(&[0.0, 1.0, 4.0, 5.0], "360_day");

    let relaxed = ds
        .infer_frequency(&InferOptions::default())
        .expect("inference");
    assert!(matches!(relaxed, FrequencyVerdict::Irregular(_)));

    let strict = ds
        .infer_frequency(&InferOptions {
            strict: true,
            ..InferOptions::default()
        })
        .expect("inference");
    assert!(matches!(strict, FrequencyVerdict::MissingSteps(_)));
}

#[test]
fn near_regular_months_fail_strict_inference() {
    // Gregorian month starts with two one-day offsets; deltas range 28..=32.
    let times: Vec<NaiveDateTime> = [
        "3007-02-01 00:00:00",
        "3007-03-01 00:00:00",
        "3007-04-02 00:00:00",
        "3007-05-01 00:00:00",
        "3007-06-01 00:00:00",
        "3007-07-02 00:00:00",
        "3007-08-01 00:00:00",
    ]
    .iter()
    .map(|ts| parse_naive(ts))
    .collect();
    let ds = datetime_dataset(&times);

    // Loose tolerance accepts the spread as regular monthly data.
    let loose = ds
        .infer_frequency(&InferOptions {
            tolerance: 0.05,
            ..InferOptions::default()
        })
        .expect("inference");
    let FrequencyVerdict::Regular(estimate) = loose else {
        panic!("expected regular at 5% tolerance, got {loose:?}");
    };
    assert_eq!(estimate.code, "M");

    // The default 1% tolerance sees the same data as irregular.
    let tight = ds
        .infer_frequency(&InferOptions::default())
        .expect("inference");
    assert!(matches!(tight, FrequencyVerdict::Irregular(_)));

    // Strict mode refuses to guess.
    let err = ds
        .infer_frequency(&InferOptions {
            strict: true,
            ..InferOptions::default()
        })
        .expect_err("must fail");
    assert!(matches!(err, TimeError::FrequencyAmbiguous(_)));
}

#[test]
fn daily_datetime_axis_infers_daily() {
    let times: Vec<NaiveDateTime> = (1..=5)
        .map(|day| parse_naive(&format!("2000-01-{day:02} 00:00:00")))
        .collect();
    let ds = datetime_dataset(&times);
    let verdict = ds
        .infer_frequency(&InferOptions::default())
        .expect("inference");

    let FrequencyVerdict::Regular(estimate) = verdict else {
        panic!("expected a regular verdict, got {verdict:?}");
    };
    assert_eq!(estimate.label, FrequencyLabel::Daily);
    assert_eq!(estimate.interval_days, 1.0);
}

#[test]
fn verdict_is_recomputed_per_call() {
    let ds = cf_dataset(&regular_monthly_time(), "360_day");
    let first = ds
        .infer_frequency(&InferOptions::default())
        .expect("first call");
    let second = ds
        .infer_frequency(&InferOptions::default())
        .expect("second call");
    assert_eq!(first, second);
}
