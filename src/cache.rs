//! Memoization of built datasets keyed by source content identity.

use std::{collections::HashMap, fs, path::Path, sync::Arc};

use anyhow::{Context, Result};

use crate::{
    pipeline::Dataset,
    source::{SourceId, SourceSchema, parse_regions},
};

/// Built datasets by [`SourceId`] and the schema they were read with.
/// Only successful builds are stored.
#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: HashMap<(SourceId, SourceSchema), Arc<Dataset>>,
    hits: usize,
    misses: usize,
}

impl PipelineCache {
    pub fn new() -> Self { Self::default() }

    /// Returns the dataset for the current content of `path` read with
    /// `schema`, building it on first sight of that pair.
    pub fn get_or_load(&mut self, path: &Path, schema: &SourceSchema) -> Result<Arc<Dataset>> {
        let bytes = fs::read(path)
            .with_context(|| format!("[cache::get_or_load] Failed to read source file: {}", path.display()))?;
        let key = (SourceId::from_bytes(&bytes), schema.clone());

        if let Some(dataset) = self.entries.get(&key) {
            self.hits += 1;
            tracing::debug!(source = key.0.short(), "dataset cache hit");
            return Ok(dataset.clone());
        }

        self.misses += 1;
        tracing::info!(source = key.0.short(), path = %path.display(), "dataset cache miss, building");
        let regions = parse_regions(&bytes, schema)
            .with_context(|| format!("[cache::get_or_load] Failed to parse {}", path.display()))?;
        let dataset = Arc::new(Dataset::build(key.0.clone(), regions)?);
        self.entries.insert(key, dataset.clone());
        Ok(dataset)
    }

    pub fn get(&self, id: &SourceId, schema: &SourceSchema) -> Option<Arc<Dataset>> {
        self.entries.get(&(id.clone(), schema.clone())).cloned()
    }

    /// True if some schema has a dataset built from this content.
    pub fn contains(&self, id: &SourceId) -> bool { self.entries.keys().any(|(k, _)| k == id) }
    #[inline] pub fn len(&self) -> usize { self.entries.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    #[inline] pub fn hits(&self) -> usize { self.hits }
    #[inline] pub fn misses(&self) -> usize { self.misses }

    /// Drops every entry built from this content, whatever the schema.
    pub fn invalidate(&mut self, id: &SourceId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _), _| k != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) { self.entries.clear() }
}
