//! Typed workout records extracted from a parsed activity tree.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::TagSource;

/// Location of the activity node inside a Training Center document.
pub const ACTIVITY_POINTER: &str = "/TrainingCenterDatabase/Activities/Activity";

/// A node that the export writes as a bare element when it occurs once and
/// as an array when it repeats.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapSummary {
    pub distance_meters: f64,
    pub average_heart_rate_bpm: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutRecord {
    pub type_tag: String,
    /// ISO-8601 start timestamp, unique per workout.
    pub identifier: String,
    pub total_duration_seconds: f64,
    pub lap: LapSummary,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("activity #{index} is malformed: {reason}")]
pub struct MalformedRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("document has no TrainingCenterDatabase/Activities/Activity node")]
    MissingActivities,
}

#[derive(Debug, Deserialize)]
struct RawActivity {
    #[serde(rename = "Id")]
    id: Option<Value>,
    #[serde(rename = "Notes")]
    notes: Option<Value>,
    #[serde(rename = "@Sport")]
    sport: Option<Value>,
    #[serde(rename = "TotalTimeSeconds", default, deserialize_with = "lenient_number")]
    total_time_seconds: Option<f64>,
    #[serde(rename = "Lap")]
    lap: Option<OneOrMany<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawLap {
    #[serde(rename = "TotalTimeSeconds", default, deserialize_with = "lenient_number")]
    total_time_seconds: Option<f64>,
    #[serde(rename = "DistanceMeters", default, deserialize_with = "lenient_number")]
    distance_meters: Option<f64>,
    /// Optional and never fatal: a blank or odd node reads as no heart rate.
    #[serde(rename = "AverageHeartRateBpm")]
    average_heart_rate_bpm: Option<Value>,
}

impl RawLap {
    fn heart_rate(&self) -> Option<f64> {
        match self.average_heart_rate_bpm.as_ref()? {
            Value::Object(map) => number_of(map.get("Value")).ok().flatten(),
            _ => None,
        }
    }
}

/// Read a numeric leaf written as text. Blank text is the same as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    number_of(value.as_ref()).map_err(de::Error::custom)
}

fn number_of(value: Option<&Value>) -> Result<Option<f64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Some(v)),
                _ => Err(format!("'{}' is not a number", trimmed)),
            }
        }
        Some(Value::Object(map)) => number_of(map.get(crate::tree::TEXT_KEY)),
        Some(other) => Err(format!("expected a number, found {}", other)),
    }
}

/// Resolve the activity node of `tree` into one entry per workout.
pub fn activity_nodes(tree: &Value) -> Result<Vec<Value>, NormalizeError> {
    let node = tree
        .pointer(ACTIVITY_POINTER)
        .ok_or(NormalizeError::MissingActivities)?;
    let resolved: OneOrMany<Value> =
        serde_json::from_value(node.clone()).map_err(|_| NormalizeError::MissingActivities)?;
    Ok(resolved.into_vec())
}

/// Normalize every activity of `tree`; malformed entries are returned in place.
pub fn normalize_tree(
    tree: &Value,
    tag_source: TagSource,
) -> Result<Vec<Result<WorkoutRecord, MalformedRecord>>, NormalizeError> {
    Ok(activity_nodes(tree)?
        .into_iter()
        .enumerate()
        .map(|(index, node)| normalize_activity(index, node, tag_source))
        .collect())
}

pub fn normalize_activity(
    index: usize,
    node: Value,
    tag_source: TagSource,
) -> Result<WorkoutRecord, MalformedRecord> {
    let malformed = |reason: String| MalformedRecord { index, reason };

    if !node.is_object() {
        return Err(malformed("empty activity".into()));
    }
    let raw: RawActivity = serde_json::from_value(node).map_err(|e| malformed(e.to_string()))?;

    let identifier = raw
        .id
        .as_ref()
        .and_then(text_of)
        .ok_or_else(|| malformed("missing Id".into()))?;

    let tag_field = match tag_source {
        TagSource::Notes => raw.notes.as_ref(),
        TagSource::Sport => raw.sport.as_ref(),
    };
    let type_tag = tag_field.and_then(text_of).unwrap_or_default();

    let lap_nodes = raw
        .lap
        .map(OneOrMany::into_vec)
        .filter(|laps| !laps.is_empty())
        .ok_or_else(|| malformed("missing Lap".into()))?;
    let laps = lap_nodes
        .into_iter()
        .enumerate()
        .map(|(lap_index, node)| {
            if !node.is_object() {
                return Err(malformed(format!("lap #{} is empty", lap_index)));
            }
            serde_json::from_value::<RawLap>(node)
                .map_err(|e| malformed(format!("lap #{}: {}", lap_index, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total_duration_seconds = match raw.total_time_seconds {
        Some(seconds) => seconds,
        None => laps
            .iter()
            .map(|lap| lap.total_time_seconds)
            .sum::<Option<f64>>()
            .ok_or_else(|| malformed("missing TotalTimeSeconds".into()))?,
    };

    let lap = summarize_laps(&laps).ok_or_else(|| malformed("missing Lap DistanceMeters".into()))?;

    Ok(WorkoutRecord {
        type_tag,
        identifier,
        total_duration_seconds,
        lap,
    })
}

/// Fold the laps of one activity into a single summary.
///
/// Every lap must carry a distance. Heart rate is the mean over laps that
/// report one.
fn summarize_laps(laps: &[RawLap]) -> Option<LapSummary> {
    let distance_meters = laps.iter().map(|lap| lap.distance_meters).sum::<Option<f64>>()?;
    let rates: Vec<f64> = laps
        .iter()
        .filter_map(RawLap::heart_rate)
        .collect();
    let average_heart_rate_bpm = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    };
    Some(LapSummary {
        distance_meters,
        average_heart_rate_bpm,
    })
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(crate::tree::TEXT_KEY).and_then(text_of),
        _ => None,
    }
}
