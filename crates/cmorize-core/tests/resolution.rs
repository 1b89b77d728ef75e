use cmorize_core::{
    Dataset, FrequencyVerdict, InferOptions, ResolutionRelation, TimeError,
};
use polars::df;

fn cf_dataset(time_values: &[f64], calendar: &str) -> Dataset {
    let frame = df![
        "time" => time_values.to_vec(),
        "pr" => vec![0.5; time_values.len()],
    ]
    .expect("frame");
    let mut ds = Dataset::new(frame).expect("dataset");
    ds.set_var_attr("time", "units", "days since 2000-01-01");
    ds.set_var_attr("time", "calendar", calendar);
    ds
}

fn monthly_midpoints() -> Vec<f64> {
    (0..4).map(|month| 14.0 + 30.0 * f64::from(month)).collect()
}

#[test]
fn monthly_data_is_finer_than_a_longer_month() {
    let ds = cf_dataset(&monthly_midpoints(), "360_day");
    let check = ds
        .check_resolution(30.5, &InferOptions::default())
        .expect("check");

    assert_eq!(check.relation, ResolutionRelation::Finer);
    assert!(check.is_valid_for_resampling);
    assert_eq!(check.inferred_interval_days, 30.0);
    assert_eq!(check.target_interval_days, 30.5);
}

#[test]
fn monthly_data_matches_a_monthly_target() {
    let ds = cf_dataset(&monthly_midpoints(), "360_day");
    let check = ds
        .check_resolution(30.0, &InferOptions::default())
        .expect("check");

    assert_eq!(check.relation, ResolutionRelation::Equal);
    assert!(check.is_valid_for_resampling);
}

#[test]
fn quarterly_data_is_too_sparse_for_monthly() {
    let ds = cf_dataset(&[0.0, 90.0, 180.0], "360_day");
    let check = ds
        .check_resolution(30.4375, &InferOptions::default())
        .expect("check");

    assert_eq!(check.relation, ResolutionRelation::Coarser);
    assert!(!check.is_valid_for_resampling);
}

#[test]
fn relation_is_monotonic_in_the_target() {
    let ds = cf_dataset(&[0.0, 1.0, 2.0, 3.0, 4.0], "360_day");

    let equal = ds
        .check_resolution(1.0, &InferOptions::default())
        .expect("check");
    assert_eq!(equal.relation, ResolutionRelation::Equal);
    assert!(equal.is_valid_for_resampling);

    let finer = ds
        .check_resolution(30.0, &InferOptions::default())
        .expect("check");
    assert_eq!(finer.relation, ResolutionRelation::Finer);
    assert!(finer.is_valid_for_resampling);

    let coarser = ds
        .check_resolution(0.5, &InferOptions::default())
        .expect("check");
    assert_eq!(coarser.relation, ResolutionRelation::Coarser);
    assert!(!coarser.is_valid_for_resampling);
}

#[test]
fn strict_mode_rejects_an_axis_with_a_skipped_month() {
    // Months 1, 2, 4, 5 at day 15: March is missing.
    let ds = cf_dataset(&[14.0, 44.0, 104.0, 134.0], "360_day");
    let options = InferOptions {
        strict: true,
        ..InferOptions::default()
    };
    let check = ds.check_resolution(30.0, &options).expect("check");

    assert!(matches!(check.verdict, FrequencyVerdict::MissingSteps(_)));
    assert!(!check.is_valid_for_resampling);
}

#[test]
fn strict_mode_propagates_ambiguity() {
    let ds = cf_dataset(&[0.0, 19.0, 44.0, 69.0], "360_day");
    let options = InferOptions {
        strict: true,
        ..InferOptions::default()
    };
    let err = ds.check_resolution(30.0, &options).expect_err("must fail");
    assert!(matches!(err, TimeError::FrequencyAmbiguous(_)));
}

#[test]
fn non_positive_targets_are_rejected() {
    let ds = cf_dataset(&monthly_midpoints(), "360_day");
    let err = ds
        .check_resolution(0.0, &InferOptions::default())
        .expect_err("must fail");
    assert!(matches!(err, TimeError::InvalidFrequency(_)));
}

#[test]
fn check_result_serializes_to_json() {
    let ds = cf_dataset(&monthly_midpoints(), "360_day");
    let check = ds
        .check_resolution(30.0, &InferOptions::default())
        .expect("check");
    let json = check.to_json().expect("json");
    assert!(json.contains("\"relation\":\"equal\""));
    assert!(json.contains("\"is_valid_for_resampling\":true"));
}
