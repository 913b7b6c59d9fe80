//! FFprobe integration for reading video stream metadata.
//!
//! The pipeline needs the frame size, frame rate and (when available) the
//! frame count of the first video stream before it can open a writer.

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};

use ffprobe::{FfProbeError, ffprobe};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::path::Path;

/// Rational frame rate as reported by ffprobe (e.g. `30000/1001`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Parses `"num/den"` or a whole number. Zero rates are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (num, den) = match value.split_once('/') {
            Some((num, den)) => (num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => (value.parse().ok()?, 1),
        };
        if num == 0 || den == 0 {
            return None;
        }
        Some(Self::new(num, den))
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Properties of the first video stream of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Frame count from the container, or estimated from the duration
    pub total_frames: Option<u64>,
    pub duration_secs: Option<f64>,
    pub codec_name: Option<String>,
}

impl VideoProperties {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Reads video properties with ffprobe.
pub fn probe_video(path: &Path) -> CoreResult<VideoProperties> {
    if !path.is_file() {
        return Err(CoreError::SourceOpen {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }

    log::debug!("Running ffprobe for video properties on: {}", path.display());
    let metadata = ffprobe(path).map_err(|err| map_ffprobe_error(err, path))?;

    let source_error = |reason: &str| CoreError::SourceOpen {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let stream = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| source_error("no video stream found"))?;

    let width = stream
        .width
        .filter(|w| *w > 0)
        .ok_or_else(|| source_error("video stream has no valid width"))?;
    let height = stream
        .height
        .filter(|h| *h > 0)
        .ok_or_else(|| source_error("video stream has no valid height"))?;

    let frame_rate = FrameRate::parse(&stream.avg_frame_rate)
        .or_else(|| FrameRate::parse(&stream.r_frame_rate))
        .ok_or_else(|| source_error("video stream has no usable frame rate"))?;

    let duration_secs = metadata
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0);

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| duration_secs.map(|d| (d * frame_rate.as_f64()).round() as u64));

    let properties = VideoProperties {
        width: width as u32,
        height: height as u32,
        frame_rate,
        total_frames,
        duration_secs,
        codec_name: stream.codec_name.clone(),
    };
    log::debug!("Probed {}: {:?}", path.display(), properties);
    Ok(properties)
}

fn map_ffprobe_error(err: FfProbeError, path: &Path) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error("ffprobe", io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                command_failed_error("ffprobe", output.status, stderr)
            } else {
                CoreError::SourceOpen {
                    path: path.to_path_buf(),
                    reason: stderr,
                }
            }
        }
        FfProbeError::Deserialize(err) => CoreError::SourceOpen {
            path: path.to_path_buf(),
            reason: format!("unreadable ffprobe output: {err}"),
        },
        other => CoreError::SourceOpen {
            path: path.to_path_buf(),
            reason: format!("{other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rational_and_integer_rates() {
        let ntsc = FrameRate::parse("30000/1001").unwrap();
        assert_eq!(ntsc, FrameRate::new(30000, 1001));
        assert!((ntsc.as_f64() - 29.97).abs() < 0.01);
        assert_eq!(ntsc.to_string(), "30000/1001");

        assert_eq!(FrameRate::parse("25").unwrap(), FrameRate::new(25, 1));
        assert_eq!(FrameRate::parse(" 24/1 ").unwrap().as_f64(), 24.0);
    }

    #[test]
    fn rejects_unusable_rates() {
        assert!(FrameRate::parse("0/0").is_none());
        assert!(FrameRate::parse("30/0").is_none());
        assert!(FrameRate::parse("").is_none());
        assert!(FrameRate::parse("abc").is_none());
    }

    #[test]
    fn missing_file_is_source_open_error() {
        let err = probe_video(Path::new("/definitely/not/here.mp4")).unwrap_err();
        assert!(matches!(err, CoreError::SourceOpen { .. }));
    }
}
