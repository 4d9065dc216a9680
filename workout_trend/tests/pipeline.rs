use std::fs;
use std::path::Path;

use workout_trend::aggregate::METERS_TO_MILES;
use workout_trend::{collect_tags, run, Params, PipelineOutcome, TrendError, TypeFilter};

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
  <Activities>"#;
const FOOTER: &str = "
  </Activities>
</TrainingCenterDatabase>";

fn activity(tag: &str, id: &str, seconds: f64, meters: f64) -> String {
    format!(
        r#"
    <Activity Sport="Other">
      <Id>{id}</Id>
      <Notes>{tag}</Notes>
      <TotalTimeSeconds>{seconds}</TotalTimeSeconds>
      <Lap StartTime="{id}">
        <TotalTimeSeconds>{seconds}</TotalTimeSeconds>
        <DistanceMeters>{meters}</DistanceMeters>
        <AverageHeartRateBpm><Value>131</Value></AverageHeartRateBpm>
      </Lap>
    </Activity>"#
    )
}

fn write_tcx(dir: &Path, name: &str, activities: &[String]) {
    let body = format!("{}{}{}", HEADER, activities.concat(), FOOTER);
    fs::write(dir.join(name), body).unwrap();
}

fn params_for(dir: &Path, tag: &str) -> Params {
    Params {
        data_dir: dir.to_path_buf(),
        workout_type: TypeFilter::parse(tag),
        ..Params::default()
    }
}

fn expect_report(outcome: PipelineOutcome) -> workout_trend::Report {
    match outcome {
        PipelineOutcome::Aggregated(report) => report,
        other => panic!("expected an aggregated report, got {:?}", other),
    }
}

#[test]
fn single_and_array_files_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_tcx(
        dir.path(),
        "a.tcx",
        &[activity("Biking", "2020-05-01T12:00:00.000Z", 500.0, 5000.0)],
    );
    write_tcx(
        dir.path(),
        "b.tcx",
        &[
            activity("Walking", "2020-05-02T12:00:00.000Z", 900.0, 3000.0),
            activity("Running", "2020-05-03T12:00:00.000Z", 900.0, 4000.0),
        ],
    );

    let report = expect_report(run(&params_for(dir.path(), "Biking")).unwrap());
    let agg = &report.aggregation;
    assert_eq!(agg.filtered_count, 1);
    assert_eq!(agg.series.len(), 1);
    assert!((agg.series.y_values[0] - 3.107).abs() < 1e-3);
    assert!((agg.total - 3.107).abs() < 1e-3);
    assert_eq!(format!("{:.2}", agg.average), "3.11");
    assert_eq!(agg.series.x_values, vec!["May 1, 2020 12:00 PM"]);
    assert_eq!(report.files_read, 2);
    assert_eq!(report.rejected_records, 2);
}

#[test]
fn wildcard_keeps_listing_order() {
    let dir = tempfile::tempdir().unwrap();
    write_tcx(
        dir.path(),
        "1.tcx",
        &[activity("Biking", "2021-01-01T00:00:00Z", 500.0, 1000.0)],
    );
    write_tcx(
        dir.path(),
        "2.tcx",
        &[
            activity("Walking", "2019-01-01T00:00:00Z", 500.0, 2000.0),
            activity("Biking", "2020-01-01T00:00:00Z", 500.0, 3000.0),
        ],
    );
    fs::write(dir.path().join(".gitignore"), "*\n!.gitignore\n").unwrap();

    let report = expect_report(run(&params_for(dir.path(), "*")).unwrap());
    let expected: Vec<f64> = [1000.0, 2000.0, 3000.0]
        .iter()
        .map(|m| m * METERS_TO_MILES)
        .collect();
    assert_eq!(report.aggregation.series.y_values, expected);
    assert_eq!(report.files_read, 2);
}

#[test]
fn empty_directory_stops_before_plotting() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run(&params_for(dir.path(), "Biking")).unwrap();
    assert!(matches!(outcome, PipelineOutcome::NoFiles));
}

#[test]
fn no_matching_workouts_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_tcx(
        dir.path(),
        "a.tcx",
        &[activity("Walking", "2020-05-01T12:00:00Z", 500.0, 5000.0)],
    );
    match run(&params_for(dir.path(), "Biking")).unwrap() {
        PipelineOutcome::NoWorkouts(ingest) => {
            assert_eq!(ingest.files_read, 1);
            assert_eq!(ingest.rejected_records, 1);
        }
        other => panic!("expected no workouts, got {:?}", other),
    }
}

#[test]
fn only_ignored_files_yield_no_workouts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".gitignore"), "*").unwrap();
    let outcome = run(&params_for(dir.path(), "*")).unwrap();
    assert!(matches!(outcome, PipelineOutcome::NoWorkouts(_)));
}

#[test]
fn bad_files_and_records_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.tcx"), "<TrainingCenterDatabase>").unwrap();
    fs::write(dir.path().join("other.xml"), "<gpx><trk/></gpx>").unwrap();
    let no_distance = r#"
    <Activity Sport="Biking">
      <Id>2020-05-02T12:00:00Z</Id>
      <Notes>Biking</Notes>
      <TotalTimeSeconds>500</TotalTimeSeconds>
      <Lap StartTime="2020-05-02T12:00:00Z"><TotalTimeSeconds>500</TotalTimeSeconds></Lap>
    </Activity>"#
        .to_string();
    write_tcx(
        dir.path(),
        "mixed.tcx",
        &[
            no_distance,
            activity("Biking", "2020-05-03T12:00:00Z", 500.0, 1609.34),
        ],
    );

    let report = expect_report(run(&params_for(dir.path(), "Biking")).unwrap());
    assert_eq!(report.files_read, 3);
    assert_eq!(report.files_skipped, 2);
    assert_eq!(report.malformed_records, 1);
    assert_eq!(report.aggregation.filtered_count, 1);
    assert!((report.aggregation.total - 1.0).abs() < 1e-3);
}

#[test]
fn short_workout_still_counts_toward_average() {
    let dir = tempfile::tempdir().unwrap();
    write_tcx(
        dir.path(),
        "a.tcx",
        &[
            activity("Biking", "2020-05-01T12:00:00Z", 500.0, 1000.0),
            activity("Biking", "2020-05-02T12:00:00Z", 100.0, 5000.0),
            activity("Biking", "2020-05-03T12:00:00Z", 500.0, 2000.0),
        ],
    );
    let report = expect_report(run(&params_for(dir.path(), "Biking")).unwrap());
    let total = 3000.0 * METERS_TO_MILES;
    assert_eq!(report.aggregation.plotted_count, 2);
    assert!((report.aggregation.average - total / 3.0).abs() < 1e-9);
}

#[test]
fn missing_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let params = params_for(&dir.path().join("missing"), "Biking");
    assert!(matches!(
        run(&params),
        Err(TrendError::DirectoryNotFound { .. })
    ));
}

#[test]
fn counts_tags_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write_tcx(
        dir.path(),
        "a.tcx",
        &[
            activity("Biking", "2020-05-01T12:00:00Z", 500.0, 1000.0),
            activity("Walking", "2020-05-02T12:00:00Z", 500.0, 1000.0),
        ],
    );
    write_tcx(
        dir.path(),
        "b.tcx",
        &[activity("Biking", "2020-05-03T12:00:00Z", 50.0, 1000.0)],
    );
    let tags = collect_tags(&params_for(dir.path(), "Biking")).unwrap();
    assert_eq!(tags.get("Biking"), Some(&2));
    assert_eq!(tags.get("Walking"), Some(&1));
    assert_eq!(tags.len(), 2);
}

#[test]
fn numeric_looking_tag_matches_exactly() {
    let dir = tempfile::tempdir().unwrap();
    write_tcx(
        dir.path(),
        "a.tcx",
        &[
            activity("007", "2020-05-01T12:00:00Z", 500.0, 1000.0),
            activity("7", "2020-05-02T12:00:00Z", 500.0, 2000.0),
        ],
    );
    let report = expect_report(run(&params_for(dir.path(), "007")).unwrap());
    assert_eq!(report.aggregation.filtered_count, 1);
    assert_eq!(report.rejected_records, 1);
    assert_eq!(
        report.aggregation.series.x_values,
        vec!["May 1, 2020 12:00 PM"]
    );
}

#[test]
fn blank_heart_rate_keeps_the_workout() {
    let dir = tempfile::tempdir().unwrap();
    let blank_hr = r#"
    <Activity Sport="Biking">
      <Id>2020-05-01T12:00:00Z</Id>
      <Notes>Biking</Notes>
      <TotalTimeSeconds>500</TotalTimeSeconds>
      <Lap StartTime="2020-05-01T12:00:00Z">
        <DistanceMeters>5000</DistanceMeters>
        <AverageHeartRateBpm/>
      </Lap>
    </Activity>"#
        .to_string();
    write_tcx(dir.path(), "a.tcx", &[blank_hr]);

    let report = expect_report(run(&params_for(dir.path(), "Biking")).unwrap());
    assert_eq!(report.malformed_records, 0);
    assert_eq!(report.aggregation.plotted_count, 1);
    assert!((report.aggregation.total - 3.107).abs() < 1e-3);
}
