use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    join::{LongFormTable, enrich},
    normalize::normalize,
    query::{Aggregation, FilterSelection, aggregate},
    source::{RegionRecord, SourceId, SourceSchema, parse_regions, read_regions},
};

/// Everything derived from one source load. Read-only after construction.
#[derive(Debug)]
pub struct Dataset {
    pub id: SourceId,
    pub regions: Vec<RegionRecord>,
    pub table: LongFormTable,
}

impl Dataset {
    /// Reads `path` and runs the full reshaping pipeline.
    pub fn load(path: &Path, schema: &SourceSchema) -> Result<Self> {
        let (id, regions) = read_regions(path, schema)?;
        Self::build(id, regions)
            .with_context(|| format!("[pipeline::load] Failed to build long-form table from {}", path.display()))
    }

    /// Runs the pipeline on in-memory source bytes.
    pub fn from_bytes(bytes: &[u8], schema: &SourceSchema) -> Result<Self> {
        let id = SourceId::from_bytes(bytes);
        Self::build(id, parse_regions(bytes, schema)?)
    }

    /// Normalize then enrich. Either stage failing aborts the whole load.
    pub fn build(id: SourceId, regions: Vec<RegionRecord>) -> Result<Self> {
        let metrics = normalize(&regions)?;
        let table = enrich(metrics, &regions)?;
        tracing::info!(
            source = id.short(),
            units = regions.len(),
            rows = table.len(),
            "built long-form table"
        );
        Ok(Self { id, regions, table })
    }

    /// Filter-and-aggregate `metric` under `selection`.
    pub fn aggregate(&self, selection: &FilterSelection, metric: &str) -> Result<Aggregation> {
        Ok(aggregate(&self.table, selection, metric)?)
    }
}
