pub mod aggregate;
pub mod inspect;

use std::{collections::BTreeSet, path::Path, str::FromStr};

use anyhow::{Result, bail};

use crate::{
    bucket::Bucket,
    cli::SelectionArgs,
    config::AppConfig,
    query::FilterSelection,
};

/// Config file, then per-command source override.
pub(crate) fn resolve_config(cli: &crate::cli::Cli, source: Option<&Path>) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(source) = source {
        config.source = source.to_path_buf();
    }
    Ok(config)
}

/// Reject stdout and refuse to clobber unless `force`.
pub(crate) fn check_output(path: &Path, force: bool) -> Result<()> {
    if path == Path::new("-") { bail!("stdout is not supported."); }
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(())
}

/// Builds the selection from CLI flags, falling back per dimension to `defaults`.
pub(crate) fn resolve_selection(args: &SelectionArgs, defaults: &FilterSelection) -> Result<FilterSelection> {
    Ok(FilterSelection {
        rooms: parse_dimension(args.rooms.as_deref(), &defaults.rooms)?,
        eras: parse_dimension(args.era.as_deref(), &defaults.eras)?,
        furnishings: parse_dimension(args.furnishing.as_deref(), &defaults.furnishings)?,
    })
}

fn parse_dimension<B>(values: Option<&[String]>, default: &BTreeSet<B>) -> Result<BTreeSet<B>>
where
    B: Bucket + FromStr<Err = anyhow::Error>,
{
    let Some(values) = values else { return Ok(default.clone()) };
    match values {
        [one] if one.trim().eq_ignore_ascii_case("all") => Ok(B::all().iter().copied().collect()),
        [one] if one.trim().eq_ignore_ascii_case("none") => Ok(BTreeSet::new()),
        _ => values.iter()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.parse::<B>())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bucket::{ConstructionEra, Furnishing, RoomCount},
        query::SelectionDefaults,
    };

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn absent_flags_use_defaults() {
        let defaults = FilterSelection::defaults(SelectionDefaults::Refined);
        let selection = resolve_selection(&SelectionArgs::default(), &defaults).unwrap();
        assert_eq!(selection, defaults);
    }

    #[test]
    fn flags_override_per_dimension() {
        let defaults = FilterSelection::defaults(SelectionDefaults::Refined);
        let args = SelectionArgs {
            rooms: strings(&["1", "4 et plus"]),
            era: strings(&["all"]),
            furnishing: strings(&["none"]),
        };
        let selection = resolve_selection(&args, &defaults).unwrap();
        assert_eq!(selection.rooms, BTreeSet::from([RoomCount::One, RoomCount::FourOrMore]));
        assert_eq!(selection.eras.len(), ConstructionEra::all().len());
        assert!(selection.furnishings.is_empty());
        assert!(selection.is_degenerate());
    }

    #[test]
    fn labels_are_accepted() {
        let args = SelectionArgs { furnishing: strings(&["Meublé"]), ..Default::default() };
        let selection = resolve_selection(&args, &FilterSelection::all()).unwrap();
        assert_eq!(selection.furnishings, BTreeSet::from([Furnishing::Furnished]));
    }

    #[test]
    fn unknown_bucket_is_rejected() {
        let args = SelectionArgs { era: strings(&["2020"]), ..Default::default() };
        assert!(resolve_selection(&args, &FilterSelection::all()).is_err());
    }

    #[test]
    fn stdout_and_existing_outputs_are_rejected() {
        assert!(check_output(Path::new("-"), true).is_err());
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(check_output(file.path(), false).is_err());
        assert!(check_output(file.path(), true).is_ok());
    }
}
