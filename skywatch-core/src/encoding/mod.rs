// ============================================================================
// skywatch-core/src/encoding/mod.rs
// ============================================================================
//
// ENCODER MANAGER: Output Writer Selection with Codec Fallback
//
// Output codecs are named by four-character codes. The preferred code is
// tried first; if the backend cannot open a writer for it, the fallback code
// is tried with identical arguments. Only when both fail does the run abort.
//
// KEY COMPONENTS:
// - Fourcc: Four-character codec identifier and its ffmpeg encoder
// - WriterBackend / FrameWriter: Writer abstraction (see writer.rs)
// - open_writer: Primary-then-fallback writer construction
//
// AI-ASSISTANT-INFO: Output codec selection and writer construction

pub mod memory;
pub mod writer;

pub use memory::{MemoryWriterBackend, WrittenVideo};
pub use writer::{FfmpegFrameWriter, FfmpegWriterBackend, FrameWriter, WriterBackend};

use crate::error::{CoreError, CoreResult};
use crate::media::FrameRate;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Four-character codec code, e.g. `avc1` or `mp4v`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fourcc([u8; 4]);

impl Fourcc {
    /// H.264
    pub const AVC1: Fourcc = Fourcc(*b"avc1");
    /// MPEG-4 Part 2
    pub const MP4V: Fourcc = Fourcc(*b"mp4v");

    pub fn new(code: &str) -> CoreResult<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(CoreError::Config(format!(
                "Codec code '{code}' must be exactly four printable ASCII characters"
            )));
        }
        let mut code = [0u8; 4];
        code.copy_from_slice(bytes);
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// The ffmpeg encoder implementing this code, if one is known.
    pub fn ffmpeg_encoder(&self) -> Option<&'static str> {
        let code = self.0.map(|b| b.to_ascii_lowercase());
        let encoder = match &code {
            b"avc1" | b"h264" | b"x264" => "libx264",
            b"mp4v" | b"fmp4" | b"xvid" => "mpeg4",
            b"hev1" | b"hvc1" | b"hevc" => "libx265",
            b"vp09" | b"vp90" => "libvpx-vp9",
            b"vp80" => "libvpx",
            b"mjpg" => "mjpeg",
            _ => return None,
        };
        Some(encoder)
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({})", self.as_str())
    }
}

impl FromStr for Fourcc {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for Fourcc {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Fourcc> for String {
    fn from(value: Fourcc) -> Self {
        value.as_str().to_string()
    }
}

/// Opens a writer for `primary`, retrying with `fallback` on failure.
///
/// The fallback is attempted with identical path, frame rate and dimensions.
/// When both fail the returned `EncoderInit` error carries both reasons.
pub fn open_writer(
    backend: &dyn WriterBackend,
    output_path: &Path,
    primary: Fourcc,
    fallback: Fourcc,
    frame_rate: FrameRate,
    dimensions: (u32, u32),
) -> CoreResult<Box<dyn FrameWriter>> {
    let primary_err = match backend.open(output_path, primary, frame_rate, dimensions) {
        Ok(writer) => {
            info!("Writing {} with codec {primary}", output_path.display());
            return Ok(writer);
        }
        Err(e) => e,
    };

    if fallback == primary {
        return Err(CoreError::EncoderInit {
            primary: primary.to_string(),
            fallback: fallback.to_string(),
            reason: primary_err.to_string(),
        });
    }

    warn!("Codec {primary} unavailable ({primary_err}), falling back to {fallback}");

    match backend.open(output_path, fallback, frame_rate, dimensions) {
        Ok(writer) => {
            info!("Writing {} with fallback codec {fallback}", output_path.display());
            Ok(writer)
        }
        Err(fallback_err) => Err(CoreError::EncoderInit {
            primary: primary.to_string(),
            fallback: fallback.to_string(),
            reason: format!("{primary}: {primary_err}; {fallback}: {fallback_err}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_requires_four_ascii_chars() {
        assert_eq!("avc1".parse::<Fourcc>().unwrap(), Fourcc::AVC1);
        assert!("avc".parse::<Fourcc>().is_err());
        assert!("avc12".parse::<Fourcc>().is_err());
        assert!("av c".parse::<Fourcc>().is_err());
        assert!("avcé".parse::<Fourcc>().is_err());
    }

    #[test]
    fn fourcc_maps_to_ffmpeg_encoders() {
        assert_eq!(Fourcc::AVC1.ffmpeg_encoder(), Some("libx264"));
        assert_eq!(Fourcc::MP4V.ffmpeg_encoder(), Some("mpeg4"));
        assert_eq!(Fourcc::new("MJPG").unwrap().ffmpeg_encoder(), Some("mjpeg"));
        assert_eq!(Fourcc::new("H264").unwrap().ffmpeg_encoder(), Some("libx264"));
        assert_eq!(Fourcc::new("zzzz").unwrap().ffmpeg_encoder(), None);
    }

    #[test]
    fn fourcc_serializes_as_string() {
        let json = serde_json::to_string(&Fourcc::MP4V).unwrap();
        assert_eq!(json, "\"mp4v\"");
        let parsed: Fourcc = serde_json::from_str("\"hvc1\"").unwrap();
        assert_eq!(parsed.as_str(), "hvc1");
        assert!(serde_json::from_str::<Fourcc>("\"toolong\"").is_err());
    }

    #[test]
    fn primary_codec_is_used_when_available() {
        let backend = MemoryWriterBackend::new();
        let writer = open_writer(
            &backend,
            Path::new("out.mp4"),
            Fourcc::AVC1,
            Fourcc::MP4V,
            FrameRate::new(30, 1),
            (64, 48),
        )
        .unwrap();
        assert_eq!(writer.fourcc(), Fourcc::AVC1);
        assert_eq!(backend.attempts(), vec![Fourcc::AVC1]);
    }

    #[test]
    fn falls_back_with_identical_arguments() {
        let backend = MemoryWriterBackend::new().with_unavailable(Fourcc::AVC1);
        let writer = open_writer(
            &backend,
            Path::new("out.mp4"),
            Fourcc::AVC1,
            Fourcc::MP4V,
            FrameRate::new(25, 1),
            (64, 48),
        )
        .unwrap();
        assert_eq!(writer.fourcc(), Fourcc::MP4V);
        assert_eq!(writer.dimensions(), (64, 48));
        assert_eq!(backend.attempts(), vec![Fourcc::AVC1, Fourcc::MP4V]);

        let video = backend.last_video().unwrap();
        assert_eq!(video.frame_rate, FrameRate::new(25, 1));
        assert_eq!(video.path, Path::new("out.mp4"));
    }

    #[test]
    fn both_codecs_failing_is_encoder_init_error() {
        let backend = MemoryWriterBackend::new()
            .with_unavailable(Fourcc::AVC1)
            .with_unavailable(Fourcc::MP4V);
        let err = open_writer(
            &backend,
            Path::new("out.mp4"),
            Fourcc::AVC1,
            Fourcc::MP4V,
            FrameRate::new(25, 1),
            (64, 48),
        )
        .err()
        .unwrap();
        match err {
            CoreError::EncoderInit {
                primary, fallback, ..
            } => {
                assert_eq!(primary, "avc1");
                assert_eq!(fallback, "mp4v");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.videos().is_empty());
    }
}
