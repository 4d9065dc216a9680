//! One-pass fold of the filtered workouts into a chart series and totals.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::normalize::WorkoutRecord;
use crate::{AverageBasis, Metric, Params};

/// 1 meter in miles.
pub const METERS_TO_MILES: f64 = 0.000621371;

const LONG_DATE_FORMAT: &str = "%B %-d, %Y %-I:%M %p";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub x_values: Vec<String>,
    pub y_values: Vec<f64>,
    pub kind: SeriesKind,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.y_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y_values.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.x_values
            .iter()
            .map(String::as_str)
            .zip(self.y_values.iter().copied())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Aggregation {
    pub series: ChartSeries,
    pub total: f64,
    pub average: f64,
    /// Size of the filtered workout set handed to [`aggregate`].
    pub filtered_count: usize,
    /// Workouts that survived the per-record gates and were plotted.
    pub plotted_count: usize,
}

#[derive(Default)]
struct Accumulator {
    x_values: Vec<String>,
    y_values: Vec<f64>,
    total: f64,
}

/// Compute the Y value of one workout, or `None` when it has no such value.
pub fn metric_value(record: &WorkoutRecord, metric: Metric) -> Option<f64> {
    match metric {
        Metric::DistanceMiles => Some(record.lap.distance_meters * METERS_TO_MILES),
        Metric::AverageHeartRate => record.lap.average_heart_rate_bpm,
    }
}

/// Format an ISO-8601 timestamp as a long UTC date label, e.g. `May 1, 2020 12:00 PM`.
///
/// Timestamps without an offset are read as UTC; a bare date is midnight.
pub fn format_utc_long(iso: &str) -> Option<String> {
    let iso = iso.trim();
    let utc: DateTime<Utc> = if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f") {
        naive.and_utc()
    } else {
        NaiveDate::parse_from_str(iso, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
    };
    Some(utc.format(LONG_DATE_FORMAT).to_string())
}

/// Fold `workouts` (the filtered set, in source order) into a chart series.
///
/// Records at or under the duration gate, without the chosen metric, at or
/// under the optional minimum metric, or with an unreadable timestamp are
/// left off the chart. The average divides by the filtered count unless
/// `params.average_basis` asks for the plotted count.
pub fn aggregate(workouts: &[WorkoutRecord], params: &Params) -> Aggregation {
    let acc = workouts
        .iter()
        .fold(Accumulator::default(), |mut acc, workout| {
            if workout.total_duration_seconds <= params.min_duration_seconds {
                return acc;
            }
            let Some(value) = metric_value(workout, params.metric) else {
                debug!(
                    "Workout {} has no {} value, skipping",
                    workout.identifier,
                    params.metric.label()
                );
                return acc;
            };
            if let Some(threshold) = params.min_metric {
                if value <= threshold {
                    return acc;
                }
            }
            let Some(label) = format_utc_long(&workout.identifier) else {
                warn!(
                    "Workout id {:?} is not an ISO-8601 timestamp, skipping",
                    workout.identifier
                );
                return acc;
            };
            acc.total += value;
            acc.x_values.push(label);
            acc.y_values.push(value);
            acc
        });

    let filtered_count = workouts.len();
    let plotted_count = acc.y_values.len();
    let denominator = match params.average_basis {
        AverageBasis::Filtered => filtered_count,
        AverageBasis::Plotted => plotted_count,
    };
    let average = if denominator == 0 {
        0.0
    } else {
        acc.total / denominator as f64
    };

    info!(
        "Parsed {} workouts, all Y-Axis values added together equal {}, averaging to {:.2} per workout.",
        filtered_count, acc.total, average
    );

    Aggregation {
        series: ChartSeries {
            x_values: acc.x_values,
            y_values: acc.y_values,
            kind: SeriesKind::Line,
        },
        total: acc.total,
        average,
        filtered_count,
        plotted_count,
    }
}
