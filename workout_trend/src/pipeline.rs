//! Loader → normalizer → filter → aggregator, strictly in listing order.

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::aggregate::{aggregate, Aggregation};
use crate::filter::TypeFilter;
use crate::normalize::{normalize_tree, WorkoutRecord};
use crate::{loader, tree, Params, TrendError};

/// Workouts gathered from the data directory, before aggregation.
#[derive(Clone, Debug, Default)]
pub struct Ingest {
    /// Admitted workouts in listing order, then document order.
    pub workouts: Vec<WorkoutRecord>,
    pub files_read: usize,
    /// Files that were read but not usable as activity documents.
    pub files_skipped: usize,
    pub malformed_records: usize,
    pub rejected_records: usize,
}

#[derive(Clone, Debug)]
pub struct Report {
    pub aggregation: Aggregation,
    pub files_read: usize,
    pub files_skipped: usize,
    pub malformed_records: usize,
    pub rejected_records: usize,
}

#[derive(Clone, Debug)]
pub enum PipelineOutcome {
    /// The data directory was empty.
    NoFiles,
    /// Files were present but no workout passed the type filter.
    NoWorkouts(Ingest),
    Aggregated(Report),
}

/// Read, normalize and type-filter every file of the data directory.
///
/// Returns `Ok(None)` when the directory has no entries at all.
pub fn ingest(params: &Params, filter: &TypeFilter) -> Result<Option<Ingest>, TrendError> {
    let dir = params.data_dir.as_path();
    let entries = loader::list_entries(dir)?;
    if entries.is_empty() {
        return Ok(None);
    }

    let mut ingest = Ingest::default();
    for name in &entries {
        let Some(text) = loader::read_entry(dir, name)? else {
            continue;
        };
        ingest.files_read += 1;

        let Some(parsed) = tree::parse_tree(&text) else {
            warn!("Found unparsed XML file {}", name);
            ingest.files_skipped += 1;
            continue;
        };

        let records = match normalize_tree(&parsed, params.tag_source) {
            Ok(records) => records,
            Err(err) => {
                warn!("Skipping {}: {}", name, err);
                ingest.files_skipped += 1;
                continue;
            }
        };

        for record in records {
            match record {
                Ok(workout) => {
                    if filter.admit(&workout) {
                        ingest.workouts.push(workout);
                    } else {
                        ingest.rejected_records += 1;
                    }
                }
                Err(malformed) => {
                    warn!("Skipping workout in {}: {}", name, malformed);
                    ingest.malformed_records += 1;
                }
            }
        }
    }
    Ok(Some(ingest))
}

/// Run the whole analysis described by `params`.
pub fn run(params: &Params) -> Result<PipelineOutcome, TrendError> {
    params.validate()?;

    let Some(ingest) = ingest(params, &params.workout_type)? else {
        warn!(
            "No files found in the data directory {}.",
            params.data_dir.display()
        );
        return Ok(PipelineOutcome::NoFiles);
    };

    if ingest.workouts.is_empty() {
        error!("Unable to find any workouts to analyze.");
        return Ok(PipelineOutcome::NoWorkouts(ingest));
    }

    info!("Found {} workouts to analyze!", ingest.workouts.len());

    let aggregation = aggregate(&ingest.workouts, params);
    Ok(PipelineOutcome::Aggregated(Report {
        aggregation,
        files_read: ingest.files_read,
        files_skipped: ingest.files_skipped,
        malformed_records: ingest.malformed_records,
        rejected_records: ingest.rejected_records,
    }))
}

/// Count workouts per type tag across the whole data directory.
pub fn collect_tags(params: &Params) -> Result<BTreeMap<String, usize>, TrendError> {
    params.validate()?;
    let mut counts = BTreeMap::new();
    if let Some(ingest) = ingest(params, &TypeFilter::Any)? {
        for workout in ingest.workouts {
            *counts.entry(workout.type_tag).or_insert(0) += 1;
        }
    }
    Ok(counts)
}
