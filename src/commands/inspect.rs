use anyhow::Result;

use crate::cli::InspectArgs;
use crate::commands::{check_output, resolve_config};
use crate::pipeline::Dataset;
use crate::render::{long_form_dataframe, write_csv};

pub fn run(cli: &crate::cli::Cli, args: &InspectArgs) -> Result<()> {
    let config = resolve_config(cli, args.source.as_deref())?;
    if let Some(output) = &args.output { check_output(output, args.force)?; }

    let dataset = Dataset::load(&config.source, &config.schema)?;
    let table = &dataset.table;

    println!("source   {}", config.source.display());
    println!("sha256   {}", dataset.id);
    println!("regions  {}", dataset.regions.len());
    println!("units    {} with metrics", table.unit_count());
    println!("rows     {}", table.len());
    println!("metrics  {}", table.metrics().iter().map(|m| &**m).collect::<Vec<_>>().join(", "));

    if let Some(output) = &args.output {
        write_csv(&mut long_form_dataframe(table)?, output)?;
        println!("Wrote long-form table -> {}", output.display());
    }
    Ok(())
}
