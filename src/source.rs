//! Reading the rent dataset from a GeoJSON FeatureCollection.

use std::{fmt, fs, path::Path, sync::Arc};

use ahash::AHashSet;
use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::PipelineError;

/// Property names of the source features.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSchema {
    pub unit_id: String,
    pub zoning: String,
    pub municipality: String,
    pub insee: String,
    pub gid: String,
    pub metrics: String,
}

impl Default for SourceSchema {
    fn default() -> Self {
        Self {
            unit_id: "codeiris".to_string(),
            zoning: "zonage".to_string(),
            municipality: "commune".to_string(),
            insee: "insee".to_string(),
            gid: "gid".to_string(),
            metrics: "valeurs".to_string(),
        }
    }
}

/// Content identity of a source file (hex SHA-256 of its bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(String);

impl SourceId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> &str { &self.0[..self.0.len().min(12)] }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// One geographic unit of the raw source.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    pub unit_id: Arc<str>,
    pub zoning_code: Option<String>,
    pub municipality_code: Option<String>,
    pub insee_code: Option<String>,
    pub gid: Option<i64>,
    pub geometry: MultiPolygon<f64>,
    /// Nested `compound key -> value` object, flattened by the normalizer.
    pub raw_metrics: Map<String, Value>,
}

/// Reads and parses `path`, returning the records and the file's identity.
pub fn read_regions(path: &Path, schema: &SourceSchema) -> Result<(SourceId, Vec<RegionRecord>)> {
    let bytes = fs::read(path)
        .with_context(|| format!("[source::read_regions] Failed to read source file: {}", path.display()))?;
    let id = SourceId::from_bytes(&bytes);
    let records = parse_regions(&bytes, schema)
        .with_context(|| format!("[source::read_regions] Failed to parse {}", path.display()))?;
    Ok((id, records))
}

/// Parses a GeoJSON FeatureCollection from bytes.
pub fn parse_regions(bytes: &[u8], schema: &SourceSchema) -> Result<Vec<RegionRecord>> {
    let root: Value = serde_json::from_slice(bytes).context("[source::parse_regions] Invalid JSON")?;
    let features = root.get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("[source::parse_regions] Expected a FeatureCollection with a \"features\" array"))?;

    let mut seen = AHashSet::with_capacity(features.len());
    let mut records = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        let record = parse_feature(index, feature, schema)?;
        if !seen.insert(record.unit_id.clone()) {
            bail!(PipelineError::InvalidFeature {
                index,
                reason: format!("duplicate {} {:?}", schema.unit_id, record.unit_id),
            });
        }
        records.push(record);
    }

    tracing::debug!(features = records.len(), "parsed source features");
    Ok(records)
}

fn parse_feature(index: usize, feature: &Value, schema: &SourceSchema) -> Result<RegionRecord, PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidFeature { index, reason };

    let properties = feature.get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("missing properties object".into()))?;

    let unit_id = properties.get(&schema.unit_id)
        .and_then(scalar_to_string)
        .ok_or_else(|| invalid(format!("missing {}", schema.unit_id)))?;

    let geometry = feature.get("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| invalid(format!("unit {unit_id} has no geometry")))
        .and_then(|g| geojson_to_multipolygon(g).map_err(|e| invalid(format!("unit {unit_id}: {e}"))))?;

    // Missing metrics are an empty mapping: the unit then has no long-form rows.
    let raw_metrics = match properties.get(&schema.metrics) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => serde_json::from_str::<Map<String, Value>>(s)
            .map_err(|e| invalid(format!("unit {unit_id}: {} is not a JSON object: {e}", schema.metrics)))?,
        Some(other) => return Err(invalid(format!("unit {unit_id}: {} must be an object, found {other}", schema.metrics))),
    };

    Ok(RegionRecord {
        unit_id: Arc::from(unit_id),
        zoning_code: properties.get(&schema.zoning).and_then(scalar_to_string),
        municipality_code: properties.get(&schema.municipality).and_then(scalar_to_string),
        insee_code: properties.get(&schema.insee).and_then(scalar_to_string),
        gid: properties.get(&schema.gid).and_then(Value::as_i64),
        geometry,
        raw_metrics,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a GeoJSON Polygon or MultiPolygon geometry object into a MultiPolygon.
pub(crate) fn geojson_to_multipolygon(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let ty = geometry.get("type").and_then(Value::as_str)
        .ok_or_else(|| anyhow!("geometry has no type"))?;
    let coordinates = geometry.get("coordinates")
        .ok_or_else(|| anyhow!("geometry has no coordinates"))?;

    match ty {
        "Polygon" => Ok(MultiPolygon(vec![parse_polygon(coordinates)?])),
        "MultiPolygon" => Ok(MultiPolygon(
            coordinates.as_array()
                .ok_or_else(|| anyhow!("MultiPolygon coordinates must be an array"))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => bail!("unsupported geometry type {other}, expected Polygon or MultiPolygon"),
    }
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = value.as_array()
        .ok_or_else(|| anyhow!("polygon must be an array of rings"))?
        .iter()
        .map(parse_ring);
    let exterior = rings.next().ok_or_else(|| anyhow!("polygon has no exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    value.as_array()
        .ok_or_else(|| anyhow!("ring must be an array of positions"))?
        .iter()
        .map(|position| {
            let xy = position.as_array().filter(|p| p.len() >= 2)
                .ok_or_else(|| anyhow!("position must have at least two numbers"))?;
            match (xy[0].as_f64(), xy[1].as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => bail!("position coordinates must be numbers"),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}
