//! In-memory frame source.
//!
//! Serves frames that are already decoded. Used by the integration tests and
//! by embedders that decode video themselves. A decode failure can be
//! injected at a chosen frame, and a shared flag records when the source has
//! been released.

use super::FrameSource;
use super::probe::{FrameRate, VideoProperties};
use crate::error::{CoreError, CoreResult};

use image::{Rgb, RgbImage};

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

pub struct MemoryFrameSource {
    properties: VideoProperties,
    frames: VecDeque<RgbImage>,
    fail_at: Option<u64>,
    next_index: u64,
    released: Rc<Cell<bool>>,
}

impl MemoryFrameSource {
    /// Creates a source over `frames`. Dimensions are taken from the first
    /// frame (0x0 when empty) and the frame count is known up front.
    pub fn new(frames: Vec<RgbImage>, frame_rate: FrameRate) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let total = frames.len() as u64;
        let properties = VideoProperties {
            width,
            height,
            frame_rate,
            total_frames: Some(total),
            duration_secs: Some(total as f64 / frame_rate.as_f64()),
            codec_name: None,
        };
        Self::with_properties(frames, properties)
    }

    pub fn with_properties(frames: Vec<RgbImage>, properties: VideoProperties) -> Self {
        Self {
            properties,
            frames: frames.into(),
            fail_at: None,
            next_index: 1,
            released: Rc::new(Cell::new(false)),
        }
    }

    /// Makes reading frame `frame_index` (1-based) fail with a decode error.
    pub fn fail_at(mut self, frame_index: u64) -> Self {
        self.fail_at = Some(frame_index);
        self
    }

    /// Flag set to true when this source is dropped.
    pub fn released_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.released)
    }
}

impl FrameSource for MemoryFrameSource {
    fn properties(&self) -> &VideoProperties {
        &self.properties
    }

    fn next_frame(&mut self) -> CoreResult<Option<RgbImage>> {
        if self.fail_at == Some(self.next_index) {
            return Err(CoreError::FrameDecode(format!(
                "injected decode failure at frame {}",
                self.next_index
            )));
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.next_index += 1;
        }
        Ok(frame)
    }
}

impl Drop for MemoryFrameSource {
    fn drop(&mut self) {
        self.released.set(true);
    }
}

/// Builds `count` distinguishable frames of `width` x `height`.
///
/// Each frame is a flat colour derived from its index, so frames can be told
/// apart after they pass through the pipeline.
pub fn synthetic_frames(count: usize, width: u32, height: u32) -> Vec<RgbImage> {
    (0..count)
        .map(|i| {
            let shade = (i * 23 % 200) as u8 + 20;
            RgbImage::from_pixel(width, height, Rgb([shade, shade / 2, 255 - shade]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_frames_then_end_of_stream() {
        let mut source = MemoryFrameSource::new(synthetic_frames(2, 8, 6), FrameRate::new(25, 1));
        assert_eq!(source.properties().dimensions(), (8, 6));
        assert_eq!(source.properties().total_frames, Some(2));
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn injected_failure_and_release_flag() {
        let source = MemoryFrameSource::new(synthetic_frames(5, 4, 4), FrameRate::new(30, 1))
            .fail_at(3);
        let released = source.released_flag();
        let mut source = source;

        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(source.next_frame(), Err(CoreError::FrameDecode(_))));

        assert!(!released.get());
        drop(source);
        assert!(released.get());
    }
}
