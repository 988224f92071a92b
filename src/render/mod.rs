//! Output side of the pipeline: turns an [`Aggregation`] into files a map
//! viewer can display.
//!
//! - `geojson` - FeatureCollection with per-feature value and fill color
//! - `csv` - tabular export through polars
//! - `svg` - static choropleth with legend
//!
//! Aggregates are rounded to two decimals here and nowhere else.

mod color;
mod csv;
mod geojson;
mod svg;

pub use color::{ColorScale, Rgb};
pub use csv::{aggregation_dataframe, long_form_dataframe, write_csv};
pub use geojson::{multipolygon_to_geojson, to_geojson};
pub use svg::{render_svg, write_svg};

use crate::query::Aggregation;

/// Label shown instead of a map when no unit survives the filter.
pub const NO_DATA_LABEL: &str = "Aucune donnée pour cette sélection";

/// Rounds to the two-decimal display precision.
#[inline]
pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

/// Color scale over the observed aggregate range, `None` when empty.
pub fn color_scale(aggregation: &Aggregation) -> Option<ColorScale> {
    aggregation.value_range().map(|(lo, hi)| ColorScale::from_range(lo, hi))
}
