//! Implementation of the 'probe' subcommand.

use super::validate_input;
use crate::cli::ProbeArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::terminal;

use skywatch_core::{VideoProperties, probe_video};

pub fn run_probe(args: ProbeArgs, json: bool) -> CliResult<VideoProperties> {
    let input = validate_input(&args.input_path)?;
    let properties = probe_video(&input)?;

    if json {
        let rendered = serde_json::to_string_pretty(&properties)
            .cli_context("Failed to serialise video properties")?;
        println!("{rendered}");
    } else {
        terminal::print_probe(&input, &properties);
    }
    Ok(properties)
}
