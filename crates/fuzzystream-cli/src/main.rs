//! CLI for fuzzystream: stream hex entropy from a single-board computer.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

#[derive(Parser)]
#[command(name = "fuzzystream")]
#[command(about = "fuzzystream: a hex digit randomness beacon over WebSocket")]
#[command(version = fuzzystream_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream hex digits to every connected WebSocket client
    Serve(commands::serve::ServeArgs),

    /// Detect the thermal sensor and take one reading
    Probe(commands::probe::ProbeArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args),
        Commands::Probe(args) => commands::probe::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
