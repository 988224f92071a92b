//! Wide-to-long reshaping of the per-unit metric mappings.
//!
//! Stages, each a pure function:
//! `flatten` (nested object -> compound key columns),
//! `decompose` (compound key -> bucket tuple + metric),
//! `melt` (one record per unit and key),
//! `pivot` (metric names back into columns, one row per unit and bucket tuple).

use std::{collections::BTreeSet, sync::Arc};

use ahash::{AHashMap, AHashSet};
use serde_json::{Map, Value};

use crate::{
    bucket::BucketTuple,
    error::{PipelineError, Result},
    key::{CompoundKey, SEPARATOR},
    source::RegionRecord,
};

/// One unit's metrics flattened into `compound key -> value` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub unit_id: Arc<str>,
    pub columns: Vec<(String, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedRow {
    pub unit_id: Arc<str>,
    pub columns: Vec<(CompoundKey, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeltedRecord {
    pub unit_id: Arc<str>,
    pub tuple: BucketTuple,
    pub metric: Arc<str>,
    pub value: Option<f64>,
}

/// Long-form row before enrichment: one value slot per metric column.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub unit_id: Arc<str>,
    pub tuple: BucketTuple,
    pub values: Vec<Option<f64>>,
}

/// Output of [`pivot`]: rows keyed by (unit, bucket tuple), columns by metric name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    metrics: Vec<Arc<str>>,
    rows: Vec<MetricRow>,
}

impl MetricTable {
    #[inline] pub fn metrics(&self) -> &[Arc<str>] { &self.metrics }
    #[inline] pub fn rows(&self) -> &[MetricRow] { &self.rows }
    #[inline] pub fn len(&self) -> usize { self.rows.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| &**m == metric)
    }

    pub(crate) fn into_parts(self) -> (Vec<Arc<str>>, Vec<MetricRow>) { (self.metrics, self.rows) }
}

/// Runs all four stages.
pub fn normalize(records: &[RegionRecord]) -> Result<MetricTable> {
    let wide = flatten(records)?;
    let table = pivot(melt(decompose(wide)?))?;
    tracing::info!(units = records.len(), rows = table.len(), metrics = table.metrics.len(), "normalized to long form");
    Ok(table)
}

/// Flattens each record's nested metrics into dotted compound-key columns.
///
/// `null` leaves become missing values. Other non-numeric leaves, and two
/// paths that flatten to the same key, are errors.
pub fn flatten(records: &[RegionRecord]) -> Result<Vec<WideRow>> {
    records.iter()
        .map(|record| {
            let mut columns = Vec::new();
            let mut seen = AHashSet::new();
            flatten_into(&record.unit_id, None, &record.raw_metrics, &mut columns, &mut seen)?;
            Ok(WideRow { unit_id: record.unit_id.clone(), columns })
        })
        .collect()
}

fn flatten_into(
    unit_id: &str,
    prefix: Option<&str>,
    map: &Map<String, Value>,
    out: &mut Vec<(String, Option<f64>)>,
    seen: &mut AHashSet<String>,
) -> Result<()> {
    for (name, value) in map {
        let key = match prefix {
            Some(p) => format!("{p}{SEPARATOR}{name}"),
            None => name.clone(),
        };
        let leaf = match value {
            Value::Object(inner) => {
                flatten_into(unit_id, Some(key.as_str()), inner, out, seen)?;
                continue;
            }
            Value::Null => None,
            Value::Number(n) => n.as_f64(),
            other => return Err(PipelineError::NonNumericMetric {
                unit_id: unit_id.to_string(),
                key,
                found: other.to_string(),
            }),
        };
        if !seen.insert(key.clone()) {
            return Err(PipelineError::DuplicateKey { unit_id: unit_id.to_string(), key });
        }
        out.push((key, leaf));
    }
    Ok(())
}

/// Decomposes every column key. Any key that does not split into
/// room/era/furnishing/metric fails the whole stage.
pub fn decompose(wide: Vec<WideRow>) -> Result<Vec<DecomposedRow>> {
    wide.into_iter()
        .map(|row| {
            let columns = row.columns.into_iter()
                .map(|(key, value)| {
                    CompoundKey::split(&key)
                        .map(|k| (k, value))
                        .map_err(|source| PipelineError::Decomposition { unit_id: row.unit_id.to_string(), source })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(DecomposedRow { unit_id: row.unit_id, columns })
        })
        .collect()
}

/// One record per (unit, compound key).
pub fn melt(rows: Vec<DecomposedRow>) -> Vec<MeltedRecord> {
    rows.into_iter()
        .flat_map(|row| {
            let unit_id = row.unit_id;
            row.columns.into_iter().map(move |(key, value)| MeltedRecord {
                unit_id: unit_id.clone(),
                tuple: key.tuple,
                metric: key.metric,
                value,
            })
        })
        .collect()
}

/// Pivots metric names into columns, one row per (unit, bucket tuple) in
/// first-seen order. Never aggregates: a repeated (unit, tuple, metric) is an
/// error.
pub fn pivot(melted: Vec<MeltedRecord>) -> Result<MetricTable> {
    let metrics: Vec<Arc<str>> = melted.iter()
        .map(|m| m.metric.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let metric_pos: AHashMap<Arc<str>, usize> = metrics.iter().cloned()
        .enumerate()
        .map(|(i, m)| (m, i))
        .collect();

    let mut index: AHashMap<(Arc<str>, BucketTuple), usize> = AHashMap::new();
    let mut filled: AHashSet<(usize, usize)> = AHashSet::new();
    let mut rows: Vec<MetricRow> = Vec::new();

    for record in melted {
        let row = *index.entry((record.unit_id.clone(), record.tuple))
            .or_insert_with(|| {
                rows.push(MetricRow {
                    unit_id: record.unit_id.clone(),
                    tuple: record.tuple,
                    values: vec![None; metrics.len()],
                });
                rows.len() - 1
            });
        let col = metric_pos[&record.metric];

        if !filled.insert((row, col)) {
            return Err(PipelineError::AmbiguousPivot {
                unit_id: record.unit_id.to_string(),
                tuple: record.tuple,
                metric: record.metric.to_string(),
            });
        }
        rows[row].values[col] = record.value;
    }

    Ok(MetricTable { metrics, rows })
}
