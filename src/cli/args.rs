use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meteo-harvest")]
#[command(about = "Incremental weather and hydrology data harvester")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run configured feeds and merge new records into the store
    Harvest {
        #[arg(short, long, help = "Run configuration file")]
        config: PathBuf,

        #[arg(short, long, help = "Only run the source with this name")]
        source: Option<String>,

        #[arg(long, default_value = "false", help = "Suppress progress output")]
        silent: bool,
    },

    /// Consolidate a multi-member archive into a single canonical file
    Consolidate {
        #[arg(short, long, help = "Archive file to consolidate")]
        archive: PathBuf,

        #[arg(long, default_value = "csv", help = "Raw member file suffix")]
        member_suffix: String,
    },

    /// Show watermarks and partition coverage for the configured store
    Status {
        #[arg(short, long, help = "Run configuration file")]
        config: PathBuf,
    },
}
