//! Restores per-unit static attributes and geometry on the long-form rows.

use std::sync::Arc;

use ahash::AHashMap;
use geo::MultiPolygon;

use crate::{
    bucket::BucketTuple,
    error::{PipelineError, Result},
    normalize::MetricTable,
    source::RegionRecord,
};

/// Static attributes shared by every long-form row of a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAttributes {
    pub unit_id: Arc<str>,
    pub zoning_code: Option<String>,
    pub municipality_code: Option<String>,
    pub insee_code: Option<String>,
    pub gid: Option<i64>,
    pub geometry: MultiPolygon<f64>,
}

impl From<&RegionRecord> for RegionAttributes {
    fn from(record: &RegionRecord) -> Self {
        Self {
            unit_id: record.unit_id.clone(),
            zoning_code: record.zoning_code.clone(),
            municipality_code: record.municipality_code.clone(),
            insee_code: record.insee_code.clone(),
            gid: record.gid,
            geometry: record.geometry.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongFormRow {
    pub tuple: BucketTuple,
    pub values: Vec<Option<f64>>,
    pub region: Arc<RegionAttributes>,
}

impl LongFormRow {
    #[inline] pub fn unit_id(&self) -> &Arc<str> { &self.region.unit_id }
    #[inline] pub fn geometry(&self) -> &MultiPolygon<f64> { &self.region.geometry }
}

/// The enriched long-form table: one row per (unit, room, era, furnishing),
/// one value column per metric. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongFormTable {
    metrics: Vec<Arc<str>>,
    rows: Vec<LongFormRow>,
}

impl LongFormTable {
    #[inline] pub fn metrics(&self) -> &[Arc<str>] { &self.metrics }
    #[inline] pub fn rows(&self) -> &[LongFormRow] { &self.rows }
    #[inline] pub fn len(&self) -> usize { self.rows.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| &**m == metric)
    }

    /// Number of distinct units with at least one row.
    pub fn unit_count(&self) -> usize {
        let mut units: Vec<&str> = self.rows.iter().map(|r| &**r.unit_id()).collect();
        units.sort_unstable();
        units.dedup();
        units.len()
    }
}

/// One-to-many join of metric rows with their region record on `unit_id`.
///
/// Every metric row must match exactly one record: none, or a unit id that
/// appears on several records, fails the join.
pub fn enrich(table: MetricTable, records: &[RegionRecord]) -> Result<LongFormTable> {
    let mut index: AHashMap<&str, (Arc<RegionAttributes>, usize)> = AHashMap::with_capacity(records.len());
    for record in records {
        index.entry(&*record.unit_id)
            .and_modify(|(_, count)| *count += 1)
            .or_insert_with(|| (Arc::new(RegionAttributes::from(record)), 1));
    }

    let (metrics, metric_rows) = table.into_parts();
    let rows = metric_rows.into_iter()
        .map(|row| match index.get(&*row.unit_id) {
            Some((region, 1)) => Ok(LongFormRow { tuple: row.tuple, values: row.values, region: region.clone() }),
            Some((_, matches)) => Err(PipelineError::JoinCardinality { unit_id: row.unit_id.to_string(), matches: *matches }),
            None => Err(PipelineError::JoinCardinality { unit_id: row.unit_id.to_string(), matches: 0 }),
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(rows = rows.len(), regions = records.len(), "joined long-form rows with regions");
    Ok(LongFormTable { metrics, rows })
}
