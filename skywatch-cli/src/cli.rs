// ============================================================================
// skywatch-cli/src/cli.rs
// ============================================================================
//
// COMMAND LINE INTERFACE: Argument Definitions
//
// This module defines the command-line interface for the Skywatch CLI
// application using the clap crate.
//
// KEY COMPONENTS:
// - Cli: Main CLI structure with global options
// - Commands: Available subcommands (annotate, image, probe)
// - ProcessingArgs: Detection and speed options shared by annotate and image
//
// AI-ASSISTANT-INFO: Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use skywatch_core::{ClassNames, DetectionCountMode, Fourcc, SpeedMode};
use std::path::PathBuf;

// ============================================================================
// MAIN CLI STRUCTURE
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Skywatch: adaptive video annotation",
    long_about = "Annotates videos and images with object detections, trading accuracy \
                  for throughput through frame skipping and downscaled inference."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit machine-readable JSON on stdout instead of the human summary
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write a timestamped log file to this directory
    #[arg(long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annotates a video file
    Annotate(AnnotateArgs),

    /// Annotates a single image
    Image(ImageArgs),

    /// Prints the properties of a video file
    Probe(ProbeArgs),
}

// ============================================================================
// SHARED OPTIONS
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct ProcessingArgs {
    /// Speed preset: fast, normal or high_quality
    #[arg(long, value_name = "MODE", env = "SKYWATCH_SPEED_MODE")]
    pub speed_mode: Option<SpeedMode>,

    /// Frames skipped between inferences (overrides the preset)
    #[arg(long, value_name = "FRAMES")]
    pub skip_interval: Option<u32>,

    /// Maximum inference width in pixels (overrides the preset)
    #[arg(long = "max-dimension", value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_dimension: Option<u32>,

    /// Minimum detection confidence (0.0-1.0)
    #[arg(long, value_name = "THRESHOLD")]
    pub confidence: Option<f32>,

    /// IoU threshold for non-max suppression (0.0-1.0)
    #[arg(long, value_name = "THRESHOLD")]
    pub iou: Option<f32>,

    /// Comma-separated class labels, indexed by class id (default: civilian,soldier)
    #[arg(long, value_name = "LABELS")]
    pub classes: Option<ClassNames>,

    /// Label drawn in the benign colour; every other label is drawn as flagged
    #[arg(long, value_name = "LABEL")]
    pub benign_class: Option<String>,

    /// JSON recording of detections to replay instead of running a model
    #[arg(long, value_name = "FILE")]
    pub detections: Option<PathBuf>,

    /// JSON run configuration; explicit flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

// ============================================================================
// SUBCOMMAND ARGUMENTS
// ============================================================================

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Input video (.mp4, .avi or .mov)
    #[arg(short = 'i', long = "input", value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Output directory, or output file when it has an extension
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub processing: ProcessingArgs,

    /// Preferred output codec as a FourCC (default: avc1)
    #[arg(long, value_name = "FOURCC")]
    pub codec: Option<Fourcc>,

    /// Codec used when the preferred one cannot be opened (default: mp4v)
    #[arg(long, value_name = "FOURCC")]
    pub fallback_codec: Option<Fourcc>,

    /// Headline detection count: per_frame_drawn or per_inference
    #[arg(long, value_name = "MODE")]
    pub count_mode: Option<DetectionCountMode>,

    /// Frames between progress reports (0 reports only at the end)
    #[arg(long, value_name = "FRAMES")]
    pub progress_interval: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Input image (.png, .jpg or .jpeg)
    #[arg(short = 'i', long = "input", value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Output directory, or output file when it has an extension
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub processing: ProcessingArgs,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Video file to inspect
    #[arg(value_name = "INPUT_PATH")]
    pub input_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_annotate_overrides() {
        let cli = Cli::try_parse_from([
            "skywatch",
            "annotate",
            "-i",
            "in.mp4",
            "-o",
            "out",
            "--speed-mode",
            "normal",
            "--skip-interval",
            "5",
            "--codec",
            "mp4v",
            "--count-mode",
            "per-inference",
            "--classes",
            "person,vehicle",
        ])
        .unwrap();

        let Commands::Annotate(args) = cli.command else {
            panic!("expected annotate");
        };
        assert_eq!(args.processing.speed_mode, Some(SpeedMode::Normal));
        assert_eq!(args.processing.skip_interval, Some(5));
        assert_eq!(args.codec, Some(Fourcc::MP4V));
        assert_eq!(args.count_mode, Some(DetectionCountMode::PerInference));
        assert_eq!(args.processing.classes.unwrap().label(1), "vehicle");
    }

    #[test]
    fn rejects_zero_max_dimension() {
        let result = Cli::try_parse_from([
            "skywatch",
            "image",
            "-i",
            "in.png",
            "-o",
            "out",
            "--max-dimension",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["skywatch", "probe", "clip.mp4", "--json", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
    }
}
