use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::normalize::WorkoutRecord;

/// Tag that selects every workout regardless of type.
pub const WILDCARD: &str = "*";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TypeFilter {
    Any,
    /// Case-sensitive, untrimmed match against the record's type tag.
    Exact(String),
}

impl TypeFilter {
    pub fn parse(tag: &str) -> Self {
        if tag == WILDCARD {
            TypeFilter::Any
        } else {
            TypeFilter::Exact(tag.to_string())
        }
    }

    pub fn accepts(&self, record: &WorkoutRecord) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::Exact(tag) => record.type_tag == *tag,
        }
    }

    /// Like [`accepts`](Self::accepts), logging the rejection.
    pub fn admit(&self, record: &WorkoutRecord) -> bool {
        let accepted = self.accepts(record);
        if !accepted {
            info!(
                "This workout is not a {} workout, it is a {} workout.",
                self, record.type_tag
            );
        }
        accepted
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFilter::Any => f.write_str(WILDCARD),
            TypeFilter::Exact(tag) => f.write_str(tag),
        }
    }
}
