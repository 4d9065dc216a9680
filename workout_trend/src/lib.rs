//! Workout trend analysis over exported Training Center XML (TCX) activities.
//!
//! The crate is a single linear pipeline: list the data directory, parse each
//! file into a generic tree, normalize the activities into [`WorkoutRecord`]s,
//! filter them by type tag and fold the survivors into a [`ChartSeries`].

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod tree;

pub use aggregate::{aggregate, format_utc_long, Aggregation, ChartSeries, SeriesKind};
pub use filter::TypeFilter;
pub use normalize::{LapSummary, MalformedRecord, WorkoutRecord};
pub use pipeline::{collect_tags, run, Ingest, PipelineOutcome, Report};

#[derive(Error, Debug)]
pub enum TrendError {
    #[error("data directory {path} not found or unreadable: {source}")]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Per-workout value plotted on the Y axis.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Metric {
    DistanceMiles,
    AverageHeartRate,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::DistanceMiles
    }
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::DistanceMiles => "Distance (mi)",
            Metric::AverageHeartRate => "Average heart rate (bpm)",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Metric::DistanceMiles => "distance_mi",
            Metric::AverageHeartRate => "avg_heart_rate_bpm",
        }
    }
}

/// Where a workout's type tag is read from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TagSource {
    /// The free-text `<Notes>` element of the activity.
    Notes,
    /// The `Sport` attribute of the `<Activity>` element.
    Sport,
}

impl Default for TagSource {
    fn default() -> Self {
        TagSource::Notes
    }
}

/// Denominator used for the reported per-workout average.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AverageBasis {
    /// Every workout that passed the type filter, plotted or not.
    Filtered,
    /// Only the workouts that made it onto the chart.
    Plotted,
}

impl Default for AverageBasis {
    fn default() -> Self {
        AverageBasis::Filtered
    }
}

/// Sessions at or under this many seconds are auto-logged noise rather than workouts.
pub const DEFAULT_MIN_DURATION_SECONDS: f64 = 100.0;

/// Type tag analyzed when none is configured.
pub const DEFAULT_WORKOUT_TYPE: &str = "Biking";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Params {
    pub data_dir: PathBuf,
    pub workout_type: TypeFilter,
    pub min_duration_seconds: f64,
    pub min_metric: Option<f64>,
    pub metric: Metric,
    pub tag_source: TagSource,
    pub average_basis: AverageBasis,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/"),
            workout_type: TypeFilter::Exact(DEFAULT_WORKOUT_TYPE.to_string()),
            min_duration_seconds: DEFAULT_MIN_DURATION_SECONDS,
            min_metric: None,
            metric: Metric::DistanceMiles,
            tag_source: TagSource::Notes,
            average_basis: AverageBasis::Filtered,
        }
    }
}

impl Params {
    /// Check the numeric gates and the type tag once, before any file is read.
    pub fn validate(&self) -> Result<(), TrendError> {
        if !self.min_duration_seconds.is_finite() || self.min_duration_seconds < 0.0 {
            return Err(TrendError::InvalidParameter(format!(
                "minimum duration must be a non-negative number of seconds, got {}",
                self.min_duration_seconds
            )));
        }
        if let Some(threshold) = self.min_metric {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(TrendError::InvalidParameter(format!(
                    "minimum metric must be a non-negative number, got {}",
                    threshold
                )));
            }
        }
        if let TypeFilter::Exact(tag) = &self.workout_type {
            if tag.is_empty() {
                return Err(TrendError::InvalidParameter(
                    "workout type must not be empty (use '*' for all workouts)".into(),
                ));
            }
        }
        Ok(())
    }
}
