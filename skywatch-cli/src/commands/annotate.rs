//! Implementation of the 'annotate' subcommand.
//!
//! Validates the input video, resolves settings and the output path, then
//! hands the run to `AnnotationPipeline` with either a progress bar or JSON
//! event output attached.

use super::{resolve_output_path, resolve_settings, validate_input};
use crate::cli::AnnotateArgs;
use crate::error::{CliResult, unsupported_input};
use crate::progress::ProgressBarHandler;
use crate::terminal;

use log::info;
use skywatch_core::events::LogEventHandler;
use skywatch_core::events::json_handler::JsonProgressHandler;
use skywatch_core::utils::{VIDEO_EXTENSIONS, is_supported_video_file};
use skywatch_core::{AnnotationPipeline, PipelineOptions, PipelineStats};

use std::sync::Arc;

/// Output and reporting options from the config file and flags.
pub fn build_options(args: &AnnotateArgs, settings: &super::ResolvedSettings) -> PipelineOptions {
    let mut options = PipelineOptions::default();
    settings.run_config.apply_options(&mut options);
    // Style already merges file and flag values
    options.style = settings.style.clone();

    if let Some(codec) = args.codec {
        options.primary_codec = codec;
    }
    if let Some(codec) = args.fallback_codec {
        options.fallback_codec = codec;
    }
    if let Some(mode) = args.count_mode {
        options.count_mode = mode;
    }
    if let Some(interval) = args.progress_interval {
        options.progress_interval = interval;
    }
    options
}

pub fn run_annotate(args: AnnotateArgs, json: bool) -> CliResult<PipelineStats> {
    let input = validate_input(&args.input_path)?;
    if !is_supported_video_file(&input) {
        return Err(unsupported_input(&args.input_path, "video", VIDEO_EXTENSIONS));
    }

    let mut settings = resolve_settings(&args.processing)?;
    let options = build_options(&args, &settings);
    let output_path = resolve_output_path(&input, &args.output)?;

    info!("Input: {}", input.display());
    info!("Output: {}", output_path.display());
    info!(
        "Speed settings: skip interval {}, max inference width {}",
        settings.config.skip_interval, settings.config.max_inference_dimension
    );

    let mut pipeline =
        AnnotationPipeline::new(settings.config.clone(), options, settings.class_names.clone())?
            .with_event_handler(Arc::new(LogEventHandler));
    pipeline = if json {
        pipeline.with_event_handler(Arc::new(JsonProgressHandler::new()))
    } else {
        pipeline.with_event_handler(Arc::new(ProgressBarHandler::new()))
    };

    let stats = pipeline.run_file(settings.detector.as_mut(), &input, &output_path)?;

    if !json {
        terminal::print_run_summary(&stats, &output_path);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ProcessingArgs;
    use skywatch_core::{DetectionCountMode, Fourcc};
    use std::path::PathBuf;

    fn args() -> AnnotateArgs {
        AnnotateArgs {
            input_path: PathBuf::from("in.mp4"),
            output: PathBuf::from("out"),
            processing: ProcessingArgs::default(),
            codec: None,
            fallback_codec: None,
            count_mode: None,
            progress_interval: None,
        }
    }

    #[test]
    fn defaults_are_avc1_then_mp4v() {
        let args = args();
        let settings = resolve_settings(&args.processing).unwrap();
        let options = build_options(&args, &settings);
        assert_eq!(options.primary_codec, Fourcc::AVC1);
        assert_eq!(options.fallback_codec, Fourcc::MP4V);
        assert_eq!(options.progress_interval, 60);
    }

    #[test]
    fn flags_override_output_options() {
        let mut args = args();
        args.codec = Some(Fourcc::MP4V);
        args.fallback_codec = Some("MJPG".parse().unwrap());
        args.count_mode = Some(DetectionCountMode::PerInference);
        args.progress_interval = Some(0);
        args.processing.benign_class = Some("friendly".to_string());

        let settings = resolve_settings(&args.processing).unwrap();
        let options = build_options(&args, &settings);
        assert_eq!(options.primary_codec, Fourcc::MP4V);
        assert_eq!(options.fallback_codec.as_str(), "MJPG");
        assert_eq!(options.count_mode, DetectionCountMode::PerInference);
        assert_eq!(options.progress_interval, 0);
        assert_eq!(options.style.benign_label, "friendly");
    }

    #[test]
    fn unsupported_container_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mkv");
        std::fs::write(&input, b"not a video").unwrap();

        let mut args = args();
        args.input_path = input;
        args.output = dir.path().join("out");
        let err = run_annotate(args, true).unwrap_err();
        assert!(err.to_string().contains("not a supported video"));
    }
}
