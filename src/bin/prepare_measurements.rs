use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use data_measurements::config::Settings;
use data_measurements::data::catalog::DatasetCatalog;
use data_measurements::data::model::DatasetArgs;
use data_measurements::{logging, measure};

/// Compute the measurement cache for catalog configurations.
#[derive(Debug, Parser)]
#[command(name = "prepare_measurements", version, about)]
struct Cli {
    /// Catalog file; defaults to DMT_CATALOG.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Cache root; defaults to DMT_CACHE_DIR.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long, required_unless_present = "all")]
    dataset: Option<String>,

    /// Config name; the dataset's first config when omitted.
    #[arg(long)]
    config: Option<String>,

    /// Split name; the config's first split when omitted.
    #[arg(long)]
    split: Option<String>,

    /// Dotted path of the text field, e.g. `meta.title`.
    #[arg(long)]
    text_field: Option<String>,

    /// Prepare every configuration in the catalog.
    #[arg(long, conflicts_with = "dataset")]
    all: bool,

    /// Recompute even when cached files exist.
    #[arg(long)]
    no_cache: bool,

    /// Also compute text clusters.
    #[arg(long)]
    embeddings: bool,
}

fn selected_args(cli: &Cli, catalog: &DatasetCatalog) -> Result<Vec<DatasetArgs>> {
    if cli.all {
        return Ok(catalog.all_args());
    }
    let Some(name) = cli.dataset.as_deref() else {
        bail!("--dataset is required without --all");
    };
    let ds = catalog
        .dataset(name)
        .with_context(|| format!("dataset '{name}' is not in the catalog"))?;
    let cfg = match cli.config.as_deref() {
        Some(c) => ds
            .configs
            .iter()
            .find(|cfg| cfg.name == c)
            .with_context(|| format!("dataset '{name}' has no config '{c}'"))?,
        None => ds
            .configs
            .first()
            .with_context(|| format!("dataset '{name}' has no configs"))?,
    };
    let split = match cli.split.clone() {
        Some(s) if cfg.splits.contains_key(&s) => s,
        Some(s) => bail!("config '{}' has no split '{s}'", cfg.name),
        None => cfg
            .split_names()
            .into_iter()
            .next()
            .with_context(|| format!("config '{}' has no splits", cfg.name))?,
    };
    let text_field: Vec<String> = match cli.text_field.as_deref() {
        Some(f) => f.split('.').map(str::to_string).collect(),
        None => cfg
            .text_fields
            .first()
            .cloned()
            .with_context(|| format!("config '{}' has no text fields", cfg.name))?,
    };
    if !cfg.text_fields.contains(&text_field) {
        bail!(
            "config '{}' has no text field '{}'",
            cfg.name,
            text_field.join(".")
        );
    }
    Ok(vec![cfg.args(&ds.name, &split, &text_field)])
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    logging::init(&settings.log_dir)?;

    let catalog_path = cli.catalog.clone().unwrap_or(settings.catalog_path);
    let cache_dir = cli.cache_dir.clone().unwrap_or(settings.cache_dir);
    let catalog = DatasetCatalog::load(&catalog_path)?;

    let mut failed = 0usize;
    let all = selected_args(&cli, &catalog)?;
    for args in &all {
        let source = catalog.split_path(args);
        log::info!(
            "Preparing {} / {} / {} / {}",
            args.dset_name,
            args.dset_config,
            args.split_name,
            args.text_field_label()
        );
        match measure::load_or_prepare(&cache_dir, args.clone(), source, cli.embeddings, !cli.no_cache) {
            Ok(dstats) => println!(
                "{}: {}",
                dstats.cache_path().display(),
                if dstats.complete() { "complete" } else { "partial" }
            ),
            Err(e) => {
                log::error!("{}: {e}", args.cache_dir_name());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} configurations failed", all.len());
    }
    Ok(())
}
