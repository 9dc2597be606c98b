mod args;
mod commands;
pub mod defaults;
mod printing;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use args::{InitArgs, RunArgs};
use commands::{init, run, validate};

/// Santa: a forward-time virus evolution simulator
///
/// Evolves a population of virus genomes under mutation, recombination and
/// selection, as described by a JSON configuration file.
#[derive(Parser, Debug)]
#[command(name = "santa")]
#[command(author, version, about = "Simulates the evolution of a virus population", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter configuration file.
    ///
    /// The generated JSON can be edited and then passed to `santa run`.
    Init(InitArgs),

    /// Run a simulation described by a configuration file.
    Run(RunArgs),

    /// Check a configuration file without running it.
    Validate {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init::write_config(&args)?,
        Commands::Run(args) => run::run_simulation(&args)?,
        Commands::Validate { config } => validate::validate_config(&config)?,
    }

    Ok(())
}
