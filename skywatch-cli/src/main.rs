// ============================================================================
// skywatch-cli/src/main.rs
// ============================================================================
//
// SKYWATCH CLI: Main Entry Point
//
// Parses arguments, initialises logging, dispatches to the subcommand and
// maps failures to exit status 1.
//
// AI-ASSISTANT-INFO: Main entry point for the CLI application

use clap::Parser;
use log::debug;
use skywatch_cli::logging::init_logging;
use skywatch_cli::{Cli, CliResult, Commands, run_annotate, run_image, run_probe, terminal};

use std::process;

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_path) = init_logging(cli.verbose, cli.log_dir.as_deref())? {
        debug!("Writing log to {}", log_path.display());
    }

    match cli.command {
        Commands::Annotate(args) => run_annotate(args, cli.json).map(|_| ()),
        Commands::Image(args) => run_image(args, cli.json).map(|_| ()),
        Commands::Probe(args) => run_probe(args, cli.json).map(|_| ()),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        terminal::print_error(&e.to_string());
        process::exit(1);
    }
}
