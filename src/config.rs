//! Application configuration, read from an optional JSON file.

use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{query::SelectionDefaults, source::SourceSchema};

pub const DEFAULT_METRIC: &str = "loyer_reference_majore";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Source GeoJSON file.
    pub source: PathBuf,
    pub schema: SourceSchema,
    /// Metric averaged per unit.
    pub metric: String,
    pub selection_defaults: SelectionDefaults,
    pub map: MapView,
    pub page: PageConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("data/car_care.carencadrmtloyer_latest.json"),
            schema: SourceSchema::default(),
            metric: DEFAULT_METRIC.to_string(),
            selection_defaults: SelectionDefaults::default(),
            map: MapView::default(),
            page: PageConfig::default(),
        }
    }
}

/// Fixed view of the choropleth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    pub opacity: f64,
    pub legend: String,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center_lat: 45.764043,
            center_lon: 4.835659,
            zoom: 11,
            width: 1000,
            height: 600,
            opacity: 0.4,
            legend: "Loyer de référence majoré moyen (€/m²)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub title: String,
    pub icon: String,
    pub wide: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: "Visualisation des loyers de référence à Lyon".to_string(),
            icon: "🏠".to_string(),
            wide: false,
        }
    }
}

impl AppConfig {
    /// Reads a config file; absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[config::from_file] Failed to open config file: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[config::from_file] Invalid config in {}", path.display()))
    }

    /// `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }
}
