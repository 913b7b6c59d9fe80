// ============================================================================
// skywatch-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Human-readable Summaries
//
// Styled output for the end of each command: run summaries, image results
// and probe tables. Styling uses the console crate, which drops colours when
// the output is not a terminal.
//
// KEY COMPONENTS:
// - print_section / print_field: headings and aligned label/value lines
// - print_run_summary: counters and effective speedup of a video run
// - print_image_summary / print_probe: results of the other subcommands
//
// AI-ASSISTANT-INFO: Terminal UI components for the CLI

use console::style;
use skywatch_core::media::VideoProperties;
use skywatch_core::pipeline::PipelineStats;
use skywatch_core::still_image::ImageAnnotation;
use skywatch_core::utils::{format_bytes, format_duration};

use std::path::Path;

const LABEL_WIDTH: usize = 18;

/// Prints a section heading.
pub fn print_section(title: &str) {
    println!();
    println!("{}", style(title.to_uppercase()).cyan().bold());
}

/// Formats a label/value line with the label padded to a fixed width.
pub fn format_field(label: &str, value: &str) -> String {
    format!("  {:<width$} {value}", format!("{label}:"), width = LABEL_WIDTH)
}

pub fn print_field(label: &str, value: impl AsRef<str>) {
    println!("{}", format_field(label, value.as_ref()));
}

pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Prints an error to stderr.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

/// Summary lines for a finished video run.
pub fn run_summary_lines(stats: &PipelineStats, output_path: &Path) -> Vec<String> {
    let mut lines = vec![
        format_field("Output", &output_path.display().to_string()),
        format_field("Frames read", &stats.frames_read.to_string()),
        format_field("Frames inferred", &stats.frames_inferred.to_string()),
        format_field("Frames written", &stats.frames_written.to_string()),
        format_field("Detections", &stats.reported_detections().to_string()),
    ];

    let speedup = stats
        .speedup()
        .map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}x"));
    lines.push(format_field("Speedup", &speedup));

    if let Some(fps) = stats.processing_fps() {
        lines.push(format_field("Throughput", &format!("{fps:.1} fps")));
    }
    if let Some(codec) = stats.output_codec {
        lines.push(format_field("Codec", &codec.to_string()));
    }
    lines.push(format_field(
        "Elapsed",
        &format_duration(stats.elapsed.as_secs_f64()),
    ));
    lines
}

pub fn print_run_summary(stats: &PipelineStats, output_path: &Path) {
    print_section("Run summary");
    for line in run_summary_lines(stats, output_path) {
        println!("{line}");
    }
    if let Ok(metadata) = std::fs::metadata(output_path) {
        print_field("Output size", format_bytes(metadata.len()));
    }
    println!();

    if stats.cancelled {
        println!("{} Run cancelled before the end of the video", style("⚠").yellow().bold());
    } else {
        print_success("Annotation complete");
    }
}

pub fn print_image_summary(result: &ImageAnnotation) {
    print_section("Image annotation");
    print_field("Output", result.output_path.display().to_string());
    print_field("Size", format!("{}x{}", result.width, result.height));
    print_field("Detections", result.detections.len().to_string());
    for detection in &result.detections {
        let b = &detection.bounding_box;
        println!(
            "    {} {:.2} at ({}, {})-({}, {})",
            style(&detection.class_label).bold(),
            detection.confidence,
            b.x1,
            b.y1,
            b.x2,
            b.y2
        );
    }
    println!();
    print_success("Image annotated");
}

pub fn print_probe(path: &Path, properties: &VideoProperties) {
    print_section("Video properties");
    print_field("File", path.display().to_string());
    print_field(
        "Resolution",
        format!("{}x{}", properties.width, properties.height),
    );
    print_field(
        "Frame rate",
        format!(
            "{} ({:.3} fps)",
            properties.frame_rate,
            properties.frame_rate.as_f64()
        ),
    );
    print_field(
        "Frames",
        properties
            .total_frames
            .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
    );
    print_field(
        "Duration",
        properties
            .duration_secs
            .map_or_else(|| "unknown".to_string(), format_duration),
    );
    if let Some(codec) = &properties.codec_name {
        print_field("Codec", codec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skywatch_core::config::DetectionCountMode;
    use skywatch_core::encoding::Fourcc;
    use std::time::Duration;

    #[test]
    fn fields_are_aligned() {
        assert_eq!(format_field("Frames", "10"), "  Frames:            10");
        let a = format_field("A", "x");
        let b = format_field("Longer label", "x");
        assert_eq!(a.find('x'), b.find('x'));
    }

    #[test]
    fn run_summary_reports_speedup() {
        let mut stats = PipelineStats::new(DetectionCountMode::PerInference);
        stats.frames_read = 10;
        stats.frames_inferred = 4;
        stats.frames_written = 10;
        stats.total_detections = 20;
        stats.unique_detections = 8;
        stats.elapsed = Duration::from_secs(2);
        stats.output_codec = Some(Fourcc::AVC1);

        let lines = run_summary_lines(&stats, Path::new("out/processed_a.mp4"));
        let joined = lines.join("\n");
        assert!(joined.contains("Speedup:           2.50x"));
        assert!(joined.contains("Detections:        8"));
        assert!(joined.contains("Throughput:        5.0 fps"));
        assert!(joined.contains("Codec:             avc1"));
        assert!(joined.contains("Elapsed:           00:00:02"));
    }

    #[test]
    fn run_summary_without_inference() {
        let stats = PipelineStats::new(DetectionCountMode::default());
        let lines = run_summary_lines(&stats, Path::new("out.mp4"));
        assert!(lines.iter().any(|l| l.ends_with("n/a")));
    }
}
