use geo::MultiPolygon;
use serde_json::{Map, Value, json};

use crate::{
    config::AppConfig,
    query::Aggregation,
    render::{NO_DATA_LABEL, color_scale, round2},
};

/// Export aggregated regions as a GeoJSON FeatureCollection.
///
/// Each feature carries the unit id, the rounded value, its fill color and the
/// static attributes. A top-level `metadata` member holds the map view,
/// legend and color-scale bounds for the viewer.
pub fn to_geojson(aggregation: &Aggregation, config: &AppConfig) -> Value {
    let scale = color_scale(aggregation);

    let features: Vec<Value> = aggregation.regions.iter()
        .map(|region| {
            let attrs = region.region();
            let value = round2(region.value);
            let mut properties = Map::new();
            properties.insert("unit_id".to_string(), json!(&*region.unit_id));
            properties.insert("value".to_string(), json!(value));
            properties.insert("rows".to_string(), json!(region.row_count));
            properties.insert("zoning".to_string(), json!(attrs.zoning_code));
            properties.insert("municipality".to_string(), json!(attrs.municipality_code));
            properties.insert("insee".to_string(), json!(attrs.insee_code));
            if let Some(scale) = scale {
                properties.insert("fill".to_string(), json!(scale.color(region.value).to_string()));
            }

            // Change-detection key for the viewer: id and displayed value
            properties.insert("_hash".to_string(), json!(format!("{}:{}", region.unit_id, value)));

            json!({
                "type": "Feature",
                "id": &*region.unit_id,
                "geometry": multipolygon_to_geojson(region.geometry()),
                "properties": properties,
            })
        })
        .collect();

    let map = &config.map;
    json!({
        "type": "FeatureCollection",
        "features": features,
        "metadata": {
            "title": config.page.title,
            "icon": config.page.icon,
            "wide": config.page.wide,
            "metric": &*aggregation.metric,
            "legend": map.legend,
            "no_data": aggregation.is_empty().then_some(NO_DATA_LABEL),
            "scale": scale.map(|s| json!({ "min": s.min, "max": s.max })),
            "center": { "lat": map.center_lat, "lon": map.center_lon },
            "zoom": map.zoom,
            "opacity": map.opacity,
        },
    })
}

/// Helper to convert a MultiPolygon to a serde_json::Value representing GeoJSON Geometry.
pub fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = mp.0.iter()
        .map(|polygon| {
            let mut rings = vec![polygon.exterior()];
            rings.extend(polygon.interiors());
            json!(rings.iter()
                .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>())
                .collect::<Vec<_>>())
        })
        .collect();
    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}
