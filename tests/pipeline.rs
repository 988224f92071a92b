// End-to-end tests: GeoJSON file on disk -> long-form table -> aggregation -> outputs.

use std::{collections::BTreeSet, path::Path, sync::Arc};

use rentmap::{
    AppConfig, Bucket, BucketTuple, CompoundKey, ConstructionEra, Dataset, FilterSelection, Furnishing,
    PipelineCache, PipelineError, RoomCount, SelectionDefaults, SourceSchema,
    render::{to_geojson, write_svg},
};
use serde_json::{Value, json};

const MAJORE: &str = "loyer_reference_majore";

fn polygon(x: f64) -> Value {
    json!({ "type": "Polygon", "coordinates": [[[x, 45.7], [x + 0.01, 45.7], [x + 0.01, 45.71], [x, 45.71], [x, 45.7]]] })
}

fn feature(id: &str, x: f64, valeurs: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": polygon(x),
        "properties": { "codeiris": id, "zonage": "1", "commune": "Lyon", "insee": "69381", "valeurs": valeurs },
    })
}

fn write_collection(path: &Path, features: Vec<Value>) {
    let body = json!({ "type": "FeatureCollection", "features": features });
    std::fs::write(path, serde_json::to_vec(&body).unwrap()).unwrap();
}

/// Two units: A with 1- and 2-room rows, B with a single 1-room row.
fn scenario(path: &Path) {
    write_collection(path, vec![
        feature("A", 4.80, json!({
            "1": { "après 1990": { "non meuble": { "loyer_reference": 12.5, MAJORE: 15.0 } } },
            "2": { "après 1990": { "non meuble": { "loyer_reference": 20.8, MAJORE: 25.0 } } },
        })),
        feature("B", 4.82, json!({
            "1": { "après 1990": { "non meuble": { "loyer_reference": 7.5, MAJORE: 9.0 } } },
        })),
    ]);
}

/// Every combination for one unit, value encoding its position so filters are checkable.
fn full_unit(id: &str, x: f64) -> Value {
    let mut valeurs = serde_json::Map::new();
    for (ri, r) in RoomCount::all().iter().enumerate() {
        for (ei, e) in ConstructionEra::all().iter().enumerate() {
            for (fi, f) in Furnishing::all().iter().enumerate() {
                let value = 10.0 + ri as f64 + 0.1 * ei as f64 + 0.01 * fi as f64;
                valeurs.insert(format!("{}.{}.{}.{MAJORE}", r.key(), e.key(), f.key()), json!(value));
            }
        }
    }
    feature(id, x, Value::Object(valeurs))
}

#[test]
fn scenario_means_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    scenario(&path);

    let dataset = Dataset::load(&path, &SourceSchema::default()).unwrap();
    assert_eq!(dataset.table.len(), 3);

    let selection = FilterSelection::new(
        [RoomCount::One, RoomCount::Two],
        [ConstructionEra::After1990],
        [Furnishing::Unfurnished],
    );
    let agg = dataset.aggregate(&selection, MAJORE).unwrap();
    assert_eq!(agg.len(), 2);
    assert_eq!(agg.get("A").unwrap().value, 20.0);
    assert_eq!(agg.get("B").unwrap().value, 9.0);
}

#[test]
fn long_form_tuples_match_source_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    write_collection(&path, vec![full_unit("A", 4.80), full_unit("B", 4.82)]);

    let dataset = Dataset::load(&path, &SourceSchema::default()).unwrap();
    assert_eq!(dataset.table.len(), 2 * 4 * 4 * 2);

    for region in &dataset.regions {
        let expected: BTreeSet<BucketTuple> = region.raw_metrics.keys()
            .map(|k| CompoundKey::split(k).unwrap().tuple)
            .collect();
        let actual: BTreeSet<BucketTuple> = dataset.table.rows().iter()
            .filter(|r| r.unit_id() == &region.unit_id)
            .map(|r| r.tuple)
            .collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn filter_only_admits_selected_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    write_collection(&path, vec![full_unit("A", 4.80)]);
    let dataset = Dataset::load(&path, &SourceSchema::default()).unwrap();

    // 3 rooms (ri = 2), après 1990 (ei = 3), meuble (fi = 0) only.
    let selection = FilterSelection::new([RoomCount::Three], [ConstructionEra::After1990], [Furnishing::Furnished]);
    let agg = dataset.aggregate(&selection, MAJORE).unwrap();
    assert_eq!(agg.get("A").unwrap().row_count, 1);
    assert!((agg.get("A").unwrap().value - 12.3).abs() < 1e-12);

    // Both furnishings of the 1-room, avant 1946 rows: mean of 10.00 and 10.01.
    let selection = FilterSelection::new([RoomCount::One], [ConstructionEra::Before1946], Furnishing::all().iter().copied());
    let agg = dataset.aggregate(&selection, MAJORE).unwrap();
    assert!((agg.get("A").unwrap().value - 10.005).abs() < 1e-12);
}

#[test]
fn empty_furnishing_selection_is_no_data_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    scenario(&path);
    let dataset = Dataset::load(&path, &SourceSchema::default()).unwrap();

    let selection = FilterSelection::defaults(SelectionDefaults::Basic);
    assert!(selection.furnishings.is_empty());
    let agg = dataset.aggregate(&selection, MAJORE).unwrap();
    assert!(agg.is_empty());

    let out = dir.path().join("map.svg");
    write_svg(&agg, &AppConfig::default(), &out).unwrap();
    assert!(std::fs::read_to_string(&out).unwrap().contains(rentmap::render::NO_DATA_LABEL));
}

#[test]
fn geometry_is_shared_by_all_rows_of_a_unit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    write_collection(&path, vec![full_unit("A", 4.80), full_unit("B", 4.82)]);
    let dataset = Dataset::load(&path, &SourceSchema::default()).unwrap();

    for region in &dataset.regions {
        let rows: Vec<_> = dataset.table.rows().iter().filter(|r| r.unit_id() == &region.unit_id).collect();
        assert!(rows.iter().all(|r| r.geometry() == &region.geometry));
        assert!(rows.windows(2).all(|w| Arc::ptr_eq(&w[0].region, &w[1].region)));
    }

    let agg = dataset.aggregate(&FilterSelection::all(), MAJORE).unwrap();
    for aggregated in &agg.regions {
        let region = dataset.regions.iter().find(|r| r.unit_id == aggregated.unit_id).unwrap();
        assert_eq!(aggregated.geometry(), &region.geometry);
    }
}

#[test]
fn malformed_key_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    write_collection(&path, vec![
        feature("A", 4.80, json!({ "1.après 1990.non meuble.loyer_reference": 12.0 })),
        feature("B", 4.82, json!({ "1.après 1990.loyer_reference": 12.0 })),
    ]);

    let err = Dataset::load(&path, &SourceSchema::default()).unwrap_err();
    let pipeline = err.downcast_ref::<PipelineError>().expect("pipeline error");
    assert!(matches!(pipeline, PipelineError::Decomposition { unit_id, .. } if unit_id == "B"));
    assert!(format!("{err:#}").contains("1.après 1990.loyer_reference"));
}

#[test]
fn missing_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Dataset::load(&dir.path().join("absent.json"), &SourceSchema::default()).is_err());
}

#[test]
fn cache_serves_repeated_interactions_from_one_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    scenario(&path);

    let mut cache = PipelineCache::new();
    let first = cache.get_or_load(&path, &SourceSchema::default()).unwrap();
    let selections = [
        FilterSelection::all(),
        FilterSelection::defaults(SelectionDefaults::Refined),
        FilterSelection::none(),
    ];
    for selection in &selections {
        let dataset = cache.get_or_load(&path, &SourceSchema::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &dataset));
        dataset.aggregate(selection, MAJORE).unwrap();
    }
    assert_eq!(cache.misses(), 1);
    assert_eq!(cache.hits(), selections.len());
}

#[test]
fn geojson_output_is_rounded_and_labelled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loyers.json");
    write_collection(&path, vec![feature("A", 4.80, json!({
        "1": { "après 1990": { "non meuble": { MAJORE: 10.004 } } },
        "2": { "après 1990": { "non meuble": { MAJORE: 10.0 } } },
    }))]);
    let dataset = Dataset::load(&path, &SourceSchema::default()).unwrap();
    let agg = dataset.aggregate(&FilterSelection::all(), MAJORE).unwrap();

    // Stored aggregate keeps full precision, output is rounded.
    assert_eq!(agg.regions[0].value, (10.004 + 10.0) / 2.0);
    let out = to_geojson(&agg, &AppConfig::default());
    assert_eq!(out["features"][0]["properties"]["value"], 10.0);
    assert_eq!(out["metadata"]["legend"], "Loyer de référence majoré moyen (€/m²)");
}
