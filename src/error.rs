use thiserror::Error;

use crate::bucket::{BucketTuple, Dimension};

/// Why a compound key could not be decomposed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("compound key {key:?} has {found} segments, expected 4 separated by '.'")]
    SegmentCount { key: String, found: usize },

    #[error("compound key {key:?} has an empty segment")]
    EmptySegment { key: String },

    #[error("compound key {key:?}: {value:?} is not a known {dimension}")]
    UnknownBucket { key: String, dimension: Dimension, value: String },

    #[error("compound key {key:?} matches no {dimension} category")]
    Unmatched { key: String, dimension: Dimension },

    #[error("compound key {key:?} matches several {dimension} categories: {candidates:?}")]
    Ambiguous { key: String, dimension: Dimension, candidates: Vec<&'static str> },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Integrity errors raised while building or querying the long-form table.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unit {unit_id}: {source}")]
    Decomposition {
        unit_id: String,
        #[source]
        source: KeyError,
    },

    #[error("unit {unit_id}: metric {key:?} is not numeric (found {found})")]
    NonNumericMetric { unit_id: String, key: String, found: String },

    #[error("unit {unit_id}: compound key {key:?} appears more than once after flattening")]
    DuplicateKey { unit_id: String, key: String },

    #[error("unit {unit_id}: several values for metric {metric:?} at {tuple}, pivot is ambiguous")]
    AmbiguousPivot { unit_id: String, tuple: BucketTuple, metric: String },

    #[error("long-form row for unit {unit_id} matches {matches} region records, expected exactly 1")]
    JoinCardinality { unit_id: String, matches: usize },

    #[error("unknown metric {metric:?}, available: {available:?}")]
    UnknownMetric { metric: String, available: Vec<String> },

    #[error("invalid source feature #{index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}
