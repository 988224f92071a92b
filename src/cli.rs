use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

/// Reference rent map CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "rentmap", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file (source path, property names, map view)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the long-form table and summarize it
    Inspect(InspectArgs),

    /// Filter, aggregate per unit and write the choropleth data (forbids stdout)
    Aggregate(AggregateArgs),
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Source GeoJSON file (overrides the config)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub source: Option<PathBuf>,

    /// Also write the long-form table as CSV
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Overwrite if the file exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum OutputFormat { Geojson, Csv, Svg }

/// Bucket selections. Each flag takes keys or labels, comma separated, or
/// `all` / `none`. An absent flag falls back to the configured defaults.
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Room counts: 1, 2, 3, "4 et plus"
    #[arg(long, value_delimiter = ',')]
    pub rooms: Option<Vec<String>>,

    /// Construction eras: "avant 1946", 1946-70, 1971-90, "après 1990"
    #[arg(long, value_delimiter = ',')]
    pub era: Option<Vec<String>>,

    /// Furnishing: meuble, "non meuble"
    #[arg(long, value_delimiter = ',')]
    pub furnishing: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Source GeoJSON file (overrides the config)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub source: Option<PathBuf>,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Metric to average (overrides the config)
    #[arg(short, long)]
    pub metric: Option<String>,

    /// Output file (must be a file path; "-" is rejected)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Output format; inferred from the output extension when omitted
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Overwrite if the file exists
    #[arg(long)]
    pub force: bool,
}
