use std::path::Path;
use std::sync::Mutex;

use crate::archive::ArchiveConsolidator;
use crate::cli::args::{Cli, Commands};
use crate::config::{HarvestConfig, SourceConfig};
use crate::error::{HarvestError, Result};
use crate::harvest::{run_source, BatchRunner};
use crate::store::{PartitionStore, WatermarkTracker};
use crate::utils::progress::ProgressReporter;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Harvest {
            config,
            source,
            silent,
        } => harvest(&config, source.as_deref(), silent),

        Commands::Consolidate {
            archive,
            member_suffix,
        } => {
            let consolidator = ArchiveConsolidator::with_member_suffix(&member_suffix);
            let canonical = consolidator.consolidate(&archive)?;
            println!("Consolidated into {}", canonical.display());
            Ok(())
        }

        Commands::Status { config } => status(&config),
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_max_level(level).init();
        }
    }
    Ok(())
}

fn harvest(config_path: &Path, only: Option<&str>, silent: bool) -> Result<()> {
    // A broken configuration is fatal before any entity is attempted.
    let config = HarvestConfig::load(config_path)?;

    let selected: Vec<&SourceConfig> = config
        .sources
        .iter()
        .filter(|source| only.map_or(true, |name| source.name == name))
        .collect();
    if selected.is_empty() {
        return Err(HarvestError::Config(format!(
            "no configured source matches '{}'",
            only.unwrap_or_default()
        )));
    }

    let mut runner = BatchRunner::new();
    for source in selected {
        let progress =
            ProgressReporter::new_spinner(&format!("Harvesting {}", source.label()), silent);
        tracing::info!(source = %source.label(), "harvesting source");

        let result = run_source(&config, source);
        match &result {
            Ok(()) => progress.finish_with_message(&format!("{} done", source.label())),
            Err(error) => progress.finish_with_message(&format!("{} failed: {error}", source.label())),
        }
        runner.absorb(&source.label(), result);
    }

    runner.finish()
}

fn status(config_path: &Path) -> Result<()> {
    let config = HarvestConfig::load(config_path)?;

    for source in &config.sources {
        let store = PartitionStore::new(&config.storage_root, &source.name, &source.dataset);
        let tracker = WatermarkTracker::new(store.dataset_dir());

        println!("{}", source.label());
        match tracker.read() {
            Some(watermark) => println!("  Watermark: {watermark}"),
            None => println!("  Watermark: none"),
        }

        let stations = store.stations()?;
        println!("  Stations: {}", stations.len());
        for station in stations {
            let years = store.partition_years(&station)?;
            match (years.first(), years.last()) {
                (Some(first), Some(last)) => {
                    println!("    {station}: {} partitions ({first}..{last})", years.len())
                }
                _ => println!("    {station}: no partitions"),
            }
        }
    }
    Ok(())
}
