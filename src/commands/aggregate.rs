use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::cli::{AggregateArgs, OutputFormat};
use crate::commands::{check_output, resolve_config, resolve_selection};
use crate::pipeline::Dataset;
use crate::query::FilterSelection;
use crate::render::{NO_DATA_LABEL, aggregation_dataframe, to_geojson, write_csv, write_svg};

pub fn run(cli: &crate::cli::Cli, args: &AggregateArgs) -> Result<()> {
    let config = resolve_config(cli, args.source.as_deref())?;
    check_output(&args.output, args.force)?;

    let format = args.format.map_or_else(|| infer_format(&args.output), Ok)?;
    let selection = resolve_selection(&args.selection, &FilterSelection::defaults(config.selection_defaults))?;
    let metric = args.metric.as_deref().unwrap_or(&config.metric);

    tracing::info!(
        source = %config.source.display(),
        metric,
        rooms = ?selection.rooms,
        eras = ?selection.eras,
        furnishings = ?selection.furnishings,
        "aggregating"
    );

    let dataset = Dataset::load(&config.source, &config.schema)?;
    let aggregation = dataset.aggregate(&selection, metric)?;

    match format {
        OutputFormat::Geojson => {
            let body = serde_json::to_vec(&to_geojson(&aggregation, &config))?;
            fs::write(&args.output, body)
                .with_context(|| format!("[aggregate] Failed to write {}", args.output.display()))?;
        }
        OutputFormat::Csv => write_csv(&mut aggregation_dataframe(&aggregation)?, &args.output)?,
        OutputFormat::Svg => write_svg(&aggregation, &config, &args.output)?,
    }

    if aggregation.is_empty() {
        println!("{NO_DATA_LABEL} -> {}", args.output.display());
    } else {
        println!("Wrote {} units -> {}", aggregation.len(), args.output.display());
    }
    Ok(())
}

fn infer_format(path: &Path) -> Result<OutputFormat> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("geojson" | "json") => Ok(OutputFormat::Geojson),
        Some("csv") => Ok(OutputFormat::Csv),
        Some("svg") => Ok(OutputFormat::Svg),
        _ => anyhow::bail!("cannot infer output format from {}, pass --format", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(infer_format(Path::new("out/map.GeoJSON")).unwrap(), OutputFormat::Geojson);
        assert_eq!(infer_format(Path::new("map.svg")).unwrap(), OutputFormat::Svg);
        assert_eq!(infer_format(Path::new("rents.csv")).unwrap(), OutputFormat::Csv);
        assert!(infer_format(Path::new("rents")).is_err());
    }
}
