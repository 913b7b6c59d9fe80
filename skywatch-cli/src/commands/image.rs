//! Implementation of the 'image' subcommand.
//!
//! Annotates one still image. No ffmpeg is involved.

use super::{resolve_output_path, resolve_settings, validate_input};
use crate::cli::ImageArgs;
use crate::error::{CliErrorContext, CliResult, unsupported_input};
use crate::terminal;

use skywatch_core::utils::{IMAGE_EXTENSIONS, is_supported_image_file};
use skywatch_core::{ImageAnnotation, annotate_image};

pub fn run_image(args: ImageArgs, json: bool) -> CliResult<ImageAnnotation> {
    let input = validate_input(&args.input_path)?;
    if !is_supported_image_file(&input) {
        return Err(unsupported_input(&args.input_path, "image", IMAGE_EXTENSIONS));
    }

    let mut settings = resolve_settings(&args.processing)?;
    let output_path = resolve_output_path(&input, &args.output)?;

    let result = annotate_image(
        &input,
        &output_path,
        &settings.config,
        &settings.class_names,
        &settings.style,
        settings.detector.as_mut(),
    )?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&result).cli_context("Failed to serialise result")?;
        println!("{rendered}");
    } else {
        terminal::print_image_summary(&result);
    }
    Ok(result)
}
