//! CSV export of aggregated and long-form tables.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter}};

use crate::{bucket::Bucket, join::LongFormTable, query::Aggregation, render::round2};

/// One row per aggregated unit: id, rounded value, contributing rows, attributes.
pub fn aggregation_dataframe(aggregation: &Aggregation) -> Result<DataFrame> {
    let regions = &aggregation.regions;
    Ok(DataFrame::new(vec![
        Column::new("unit_id".into(), regions.iter().map(|r| &*r.unit_id).collect::<Vec<_>>()),
        Column::new(
            (&*aggregation.metric).into(),
            regions.iter().map(|r| round2(r.value)).collect::<Vec<_>>(),
        ),
        Column::new("rows".into(), regions.iter().map(|r| r.row_count as u32).collect::<Vec<_>>()),
        Column::new("zoning".into(), regions.iter().map(|r| r.region().zoning_code.as_deref()).collect::<Vec<_>>()),
        Column::new("municipality".into(), regions.iter().map(|r| r.region().municipality_code.as_deref()).collect::<Vec<_>>()),
        Column::new("insee".into(), regions.iter().map(|r| r.region().insee_code.as_deref()).collect::<Vec<_>>()),
    ])?)
}

/// The long-form table without geometry: one column per bucket dimension,
/// one per metric.
pub fn long_form_dataframe(table: &LongFormTable) -> Result<DataFrame> {
    let rows = table.rows();
    let mut columns = vec![
        Column::new("unit_id".into(), rows.iter().map(|r| &**r.unit_id()).collect::<Vec<_>>()),
        Column::new("rooms".into(), rows.iter().map(|r| r.tuple.rooms.key()).collect::<Vec<_>>()),
        Column::new("era".into(), rows.iter().map(|r| r.tuple.era.key()).collect::<Vec<_>>()),
        Column::new("furnishing".into(), rows.iter().map(|r| r.tuple.furnishing.key()).collect::<Vec<_>>()),
    ];
    for (i, metric) in table.metrics().iter().enumerate() {
        columns.push(Column::new((&**metric).into(), rows.iter().map(|r| r.values[i]).collect::<Vec<_>>()));
    }
    columns.push(Column::new("zoning".into(), rows.iter().map(|r| r.region.zoning_code.as_deref()).collect::<Vec<_>>()));
    columns.push(Column::new("municipality".into(), rows.iter().map(|r| r.region.municipality_code.as_deref()).collect::<Vec<_>>()));
    columns.push(Column::new("insee".into(), rows.iter().map(|r| r.region.insee_code.as_deref()).collect::<Vec<_>>()));
    Ok(DataFrame::new(columns)?)
}

/// Write a DataFrame to a CSV file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[render::csv] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[render::csv] Failed to write CSV to {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pipeline::Dataset, query::FilterSelection, source::SourceSchema};
    use serde_json::json;

    fn dataset() -> Dataset {
        let square = json!({ "type": "Polygon", "coordinates": [[[4.8, 45.7], [4.9, 45.7], [4.9, 45.8], [4.8, 45.7]]] });
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": square, "properties": { "codeiris": "A", "zonage": "Z1", "valeurs": {
                    "1": { "après 1990": { "non meuble": { "loyer_reference": 12.0, "loyer_reference_majore": 14.4 } } }
                } } },
                { "type": "Feature", "geometry": square, "properties": { "codeiris": "B", "valeurs": {
                    "2": { "avant 1946": { "meuble": { "loyer_reference": 10.0, "loyer_reference_majore": 12.0 } } }
                } } }
            ]
        });
        Dataset::from_bytes(&serde_json::to_vec(&body).unwrap(), &SourceSchema::default()).unwrap()
    }

    #[test]
    fn long_form_has_bucket_and_metric_columns() {
        let df = long_form_dataframe(&dataset().table).unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, [
            "unit_id", "rooms", "era", "furnishing",
            "loyer_reference", "loyer_reference_majore",
            "zoning", "municipality", "insee",
        ]);
    }

    #[test]
    fn aggregation_csv_is_written() {
        let ds = dataset();
        let agg = ds.aggregate(&FilterSelection::all(), "loyer_reference_majore").unwrap();
        let mut df = aggregation_dataframe(&agg).unwrap();
        assert_eq!(df.height(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agg.csv");
        write_csv(&mut df, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("unit_id,loyer_reference_majore,rows"), "{text}");
        assert!(text.contains("A,14.4,1,Z1"), "{text}");
    }

    #[test]
    fn empty_aggregation_gives_empty_frame() {
        let ds = dataset();
        let agg = ds.aggregate(&FilterSelection::none(), "loyer_reference_majore").unwrap();
        assert_eq!(aggregation_dataframe(&agg).unwrap().height(), 0);
    }
}
