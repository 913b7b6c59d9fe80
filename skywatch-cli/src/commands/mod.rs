//! Command implementations for the CLI.
//!
//! Each submodule implements one subcommand. Settings shared by the
//! annotation commands (preset, overrides, class names, detector) are
//! resolved here.

pub mod annotate;
pub mod image;
pub mod probe;

use crate::cli::ProcessingArgs;
use crate::error::{CliErrorContext, CliResult, not_a_file};

use log::{debug, info};
use skywatch_core::detection::{NullDetector, ReplayDetector};
use skywatch_core::render::AnnotationStyle;
use skywatch_core::utils::processed_output_path;
use skywatch_core::{ClassNames, Detector, ProcessingConfig, ProcessingConfigBuilder, RunConfig};

use std::fs;
use std::path::{Path, PathBuf};

/// Settings resolved from the config file and command-line flags.
pub struct ResolvedSettings {
    pub config: ProcessingConfig,
    pub run_config: RunConfig,
    pub class_names: ClassNames,
    pub style: AnnotationStyle,
    pub detector: Box<dyn Detector>,
}

/// Merges preset, config file and flags, in that order of precedence.
pub fn resolve_settings(args: &ProcessingArgs) -> CliResult<ResolvedSettings> {
    let run_config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            RunConfig::load(path)?
        }
        None => RunConfig::default(),
    };

    // A speed mode given on the command line replaces the file's preset only
    let mut file_overrides = run_config.clone();
    if args.speed_mode.is_some() {
        file_overrides.speed_mode = args.speed_mode;
    }
    let mut builder = file_overrides.apply_processing(ProcessingConfigBuilder::new());
    if let Some(skip) = args.skip_interval {
        builder = builder.skip_interval(skip);
    }
    if let Some(max) = args.max_dimension {
        builder = builder.max_inference_dimension(max);
    }
    if let Some(conf) = args.confidence {
        builder = builder.confidence_threshold(conf);
    }
    if let Some(iou) = args.iou {
        builder = builder.iou_threshold(iou);
    }
    let config = builder.build()?;

    let class_names = match (&args.classes, &run_config.classes) {
        (Some(names), _) => names.clone(),
        (None, Some(names)) => ClassNames::new(names.iter().cloned()),
        (None, None) => ClassNames::default(),
    };

    let mut style = AnnotationStyle::default();
    if let Some(benign) = args.benign_class.as_ref().or(run_config.benign_class.as_ref()) {
        style.benign_label = benign.clone();
    }

    let detector = build_detector(args.detections.as_deref())?;

    debug!(
        "Resolved settings: skip={}, max_dim={}, conf={}, iou={}, classes={class_names}",
        config.skip_interval,
        config.max_inference_dimension,
        config.confidence_threshold,
        config.iou_threshold
    );

    Ok(ResolvedSettings {
        config,
        run_config,
        class_names,
        style,
        detector,
    })
}

/// Replay detector when a recording is given, the null detector otherwise.
pub fn build_detector(recording: Option<&Path>) -> CliResult<Box<dyn Detector>> {
    match recording {
        Some(path) => {
            let detector = ReplayDetector::from_file(path)?;
            info!(
                "Replaying {} recorded detection sets from {}",
                detector.remaining(),
                path.display()
            );
            Ok(Box::new(detector))
        }
        None => {
            info!("No detections given; frames are passed through unannotated");
            Ok(Box::new(NullDetector))
        }
    }
}

/// Resolves the output path for `input`.
///
/// An `output` with an extension names the file itself; anything else is a
/// directory receiving `processed_<input file name>`. Parent directories
/// are created.
pub fn resolve_output_path(input: &Path, output: &Path) -> CliResult<PathBuf> {
    let path = if output.extension().is_some() {
        output.to_path_buf()
    } else {
        processed_output_path(input, output)?
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).cli_with_context(|| {
            format!("Failed to create output directory '{}'", parent.display())
        })?;
    }
    Ok(path)
}

/// Checks that `input` exists and is a file, returning its canonical path.
pub fn validate_input(input: &Path) -> CliResult<PathBuf> {
    let canonical = input
        .canonicalize()
        .cli_with_context(|| format!("Invalid input path '{}'", input.display()))?;
    if !canonical.is_file() {
        return Err(not_a_file(input));
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skywatch_core::SpeedMode;

    #[test]
    fn flags_override_preset() {
        let args = ProcessingArgs {
            speed_mode: Some(SpeedMode::Normal),
            skip_interval: Some(7),
            confidence: Some(0.25),
            ..ProcessingArgs::default()
        };
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.config.skip_interval, 7);
        assert_eq!(settings.config.max_inference_dimension, 640);
        assert_eq!(settings.config.confidence_threshold, 0.25);
        assert_eq!(settings.class_names, ClassNames::default());
        assert_eq!(settings.detector.name(), "null");
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{"speed_mode": "high_quality", "skip_interval": 2, "classes": ["car", "truck"], "benign_class": "car"}"#,
        )
        .unwrap();

        let args = ProcessingArgs {
            config: Some(path.clone()),
            ..ProcessingArgs::default()
        };
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.config.skip_interval, 2);
        assert_eq!(settings.config.max_inference_dimension, 1080);
        assert_eq!(settings.class_names.label(1), "truck");
        assert_eq!(settings.style.benign_label, "car");

        let args = ProcessingArgs {
            config: Some(path),
            skip_interval: Some(0),
            benign_class: Some("truck".to_string()),
            ..ProcessingArgs::default()
        };
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.config.skip_interval, 0);
        assert_eq!(settings.style.benign_label, "truck");
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let args = ProcessingArgs {
            iou: Some(1.5),
            ..ProcessingArgs::default()
        };
        assert!(resolve_settings(&args).is_err());
    }

    #[test]
    fn output_directory_gets_prefixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("annotated");
        let path = resolve_output_path(Path::new("/videos/drone.mp4"), &out_dir).unwrap();
        assert_eq!(path, out_dir.join("processed_drone.mp4"));
        assert!(out_dir.is_dir());

        let explicit = dir.path().join("nested").join("result.mp4");
        let path = resolve_output_path(Path::new("/videos/drone.mp4"), &explicit).unwrap();
        assert_eq!(path, explicit);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn missing_input_is_reported() {
        let err = validate_input(Path::new("surely/not/here.mp4")).unwrap_err();
        assert!(err.to_string().contains("Invalid input path"));
    }
}
