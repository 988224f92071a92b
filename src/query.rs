//! Filter-then-aggregate over the long-form table.

use std::{collections::BTreeSet, sync::Arc};

use ahash::AHashMap;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::{
    bucket::{Bucket, BucketTuple, ConstructionEra, Furnishing, RoomCount},
    error::{PipelineError, Result},
    join::{LongFormTable, RegionAttributes},
};

/// Which defaults the selection controls start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionDefaults {
    /// All room counts, newest era, no furnishing selected.
    Basic,
    /// All room counts, newest era, unfurnished.
    #[default]
    Refined,
}

/// Selected buckets per dimension. An empty set matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    pub rooms: BTreeSet<RoomCount>,
    pub eras: BTreeSet<ConstructionEra>,
    pub furnishings: BTreeSet<Furnishing>,
}

impl FilterSelection {
    pub fn new(
        rooms: impl IntoIterator<Item = RoomCount>,
        eras: impl IntoIterator<Item = ConstructionEra>,
        furnishings: impl IntoIterator<Item = Furnishing>,
    ) -> Self {
        Self {
            rooms: rooms.into_iter().collect(),
            eras: eras.into_iter().collect(),
            furnishings: furnishings.into_iter().collect(),
        }
    }

    /// Every bucket selected: no filtering.
    pub fn all() -> Self {
        Self::new(RoomCount::all().iter().copied(), ConstructionEra::all().iter().copied(), Furnishing::all().iter().copied())
    }

    /// Nothing selected.
    pub fn none() -> Self { Self::default() }

    pub fn defaults(variant: SelectionDefaults) -> Self {
        let furnishings: &[Furnishing] = match variant {
            SelectionDefaults::Basic => &[],
            SelectionDefaults::Refined => &[Furnishing::Unfurnished],
        };
        Self::new(RoomCount::all().iter().copied(), [ConstructionEra::After1990], furnishings.iter().copied())
    }

    /// True when some dimension has no selected bucket, so no row can match.
    pub fn is_degenerate(&self) -> bool {
        self.rooms.is_empty() || self.eras.is_empty() || self.furnishings.is_empty()
    }

    #[inline]
    pub fn contains(&self, tuple: &BucketTuple) -> bool {
        self.rooms.contains(&tuple.rooms)
            && self.eras.contains(&tuple.era)
            && self.furnishings.contains(&tuple.furnishing)
    }
}

/// Mean of the target metric for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRegion {
    pub unit_id: Arc<str>,
    /// Unrounded mean.
    pub value: f64,
    /// Number of rows that contributed a value.
    pub row_count: usize,
    region: Arc<RegionAttributes>,
}

impl AggregatedRegion {
    #[inline] pub fn geometry(&self) -> &MultiPolygon<f64> { &self.region.geometry }
    #[inline] pub fn region(&self) -> &RegionAttributes { &self.region }
}

/// Result of one filter-and-aggregate query.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub metric: Arc<str>,
    pub regions: Vec<AggregatedRegion>,
}

impl Aggregation {
    #[inline] pub fn len(&self) -> usize { self.regions.len() }

    /// No unit survived the filter. Shown to users as "no data".
    #[inline] pub fn is_empty(&self) -> bool { self.regions.is_empty() }

    /// Observed (min, max) of the aggregated values.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.regions.iter()
            .map(|r| (r.value, r.value))
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
    }

    pub fn get(&self, unit_id: &str) -> Option<&AggregatedRegion> {
        self.regions.iter().find(|r| &*r.unit_id == unit_id)
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

/// Filters rows by `selection` and averages `metric` per unit.
///
/// Units are returned in first-seen row order. A unit whose rows are all
/// filtered out, or carry no value for `metric`, is absent from the result.
pub fn aggregate(table: &LongFormTable, selection: &FilterSelection, metric: &str) -> Result<Aggregation> {
    let column = table.metric_index(metric).ok_or_else(|| PipelineError::UnknownMetric {
        metric: metric.to_string(),
        available: table.metrics().iter().map(|m| m.to_string()).collect(),
    })?;
    let metric: Arc<str> = table.metrics()[column].clone();

    if selection.is_degenerate() {
        tracing::debug!(%metric, "empty selection, no data");
        return Ok(Aggregation { metric, regions: Vec::new() });
    }

    let mut order: Vec<Arc<RegionAttributes>> = Vec::new();
    let mut groups: AHashMap<&str, Accumulator> = AHashMap::new();

    for row in table.rows().iter().filter(|row| selection.contains(&row.tuple)) {
        let Some(value) = row.values[column] else { continue };
        let acc = groups.entry(&**row.unit_id()).or_insert_with(|| {
            order.push(row.region.clone());
            Accumulator::default()
        });
        acc.sum += value;
        acc.count += 1;
    }

    let regions = order.into_iter()
        .map(|region| {
            let acc = &groups[&*region.unit_id];
            AggregatedRegion {
                unit_id: region.unit_id.clone(),
                value: acc.sum / acc.count as f64,
                row_count: acc.count,
                region,
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(%metric, units = regions.len(), "aggregated selection");
    Ok(Aggregation { metric, regions })
}
