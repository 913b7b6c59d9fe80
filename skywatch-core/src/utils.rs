//! Utility functions for formatting and file operations.
//!
//! General-purpose helpers used by the library and the CLI: input type
//! checks, output naming, and human-readable formatting.

use ffmpeg_sidecar::command::FfmpegCommand;

use std::path::{Path, PathBuf};

/// Video container extensions accepted as pipeline input.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// Image extensions accepted for single-image annotation.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Prefix added to input file names to form output names.
pub const OUTPUT_PREFIX: &str = "processed_";

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// True if `path` names a supported video container (case-insensitive).
#[must_use]
pub fn is_supported_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// True if `path` names a supported still image (case-insensitive).
#[must_use]
pub fn is_supported_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Output path for `input` inside `output_dir`: `processed_<file name>`.
pub fn processed_output_path(input: &Path, output_dir: &Path) -> crate::CoreResult<PathBuf> {
    let filename = get_filename_safe(input)?;
    Ok(output_dir.join(format!("{OUTPUT_PREFIX}{filename}")))
}

/// Formats seconds as HH:MM:SS (e.g., 3725.0 -> "01:02:05"). Returns "??:??:??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats bytes with binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Extracts the file name from a path, or fails if it has none.
pub fn get_filename_safe(path: &Path) -> crate::CoreResult<String> {
    Ok(path
        .file_name()
        .ok_or_else(|| {
            crate::CoreError::OperationFailed(format!(
                "Failed to get filename for {}",
                path.display()
            ))
        })?
        .to_string_lossy()
        .to_string())
}

/// Renders an ffmpeg command line for logging.
pub fn format_command(cmd: &FfmpegCommand) -> String {
    let args: Vec<_> = cmd
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    format!("ffmpeg {}", args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_video_file(Path::new("clip.mp4")));
        assert!(is_supported_video_file(Path::new("clip.MOV")));
        assert!(is_supported_video_file(Path::new("/a/b/clip.avi")));
        assert!(!is_supported_video_file(Path::new("clip.mkv")));
        assert!(!is_supported_video_file(Path::new("clip")));

        assert!(is_supported_image_file(Path::new("photo.JPEG")));
        assert!(is_supported_image_file(Path::new("photo.png")));
        assert!(!is_supported_image_file(Path::new("photo.gif")));
        assert!(!is_supported_image_file(Path::new("clip.mp4")));
    }

    #[test]
    fn test_processed_output_path() {
        let out = processed_output_path(Path::new("/in/drone.mp4"), Path::new("/out")).unwrap();
        assert_eq!(out, PathBuf::from("/out/processed_drone.mp4"));
        assert!(processed_output_path(Path::new("/"), Path::new("/out")).is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00:00");
        assert_eq!(format_duration(3661.0), "01:01:01");
        assert_eq!(format_duration(59.9), "00:00:59");
        assert_eq!(format_duration(-1.0), "??:??:??");
        assert_eq!(format_duration(f64::NAN), "??:??:??");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(1024 * 1024 * 2), "2.00 MiB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GiB");
    }

    #[test]
    fn test_format_command() {
        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner().input("in.mp4");
        let line = format_command(&cmd);
        assert!(line.starts_with("ffmpeg "));
        assert!(line.contains("-hide_banner"));
        assert!(line.contains("-i in.mp4"));
    }
}
