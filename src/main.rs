use clap::Parser;
use meteo_harvest::cli::{run, Cli};
use meteo_harvest::error::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
