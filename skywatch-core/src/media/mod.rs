// ============================================================================
// skywatch-core/src/media/mod.rs
// ============================================================================
//
// MEDIA: Video Metadata and Frame Sources
//
// Frames reach the pipeline through the `FrameSource` trait. The production
// source decodes with ffmpeg into raw RGB frames; the in-memory source serves
// prepared frames for tests and embedders that already hold decoded video.
//
// KEY COMPONENTS:
// - VideoProperties / FrameRate: Metadata read once when a source opens
// - probe_video: ffprobe-backed metadata lookup
// - FrameSource: Trait yielding frames in presentation order
// - FfmpegFrameSource: ffmpeg-sidecar decoder
// - MemoryFrameSource: Prepared frames, with optional decode failure

pub mod memory;
pub mod probe;
pub mod source;

pub use memory::{MemoryFrameSource, synthetic_frames};
pub use probe::{FrameRate, VideoProperties, probe_video};
pub use source::FfmpegFrameSource;

use crate::error::CoreResult;

use image::RgbImage;

/// A decoded video stream.
///
/// Frames are yielded in presentation order. `Ok(None)` marks the end of the
/// stream. A `CoreError::FrameDecode` error means no further frames can be
/// read. Dropping the source releases every underlying resource.
pub trait FrameSource {
    fn properties(&self) -> &VideoProperties;

    fn next_frame(&mut self) -> CoreResult<Option<RgbImage>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn properties(&self) -> &VideoProperties {
        (**self).properties()
    }

    fn next_frame(&mut self) -> CoreResult<Option<RgbImage>> {
        (**self).next_frame()
    }
}
