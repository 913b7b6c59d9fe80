//! In-memory writer backend.
//!
//! Records every open attempt and keeps written frames in memory instead of
//! encoding them. Codecs can be marked unavailable to exercise the fallback
//! path, and a write failure can be injected at a chosen frame.

use super::writer::{FrameWriter, WriterBackend};
use super::Fourcc;
use crate::error::{CoreError, CoreResult};
use crate::media::FrameRate;

use image::RgbImage;

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A video produced through `MemoryWriterBackend`.
#[derive(Debug, Clone)]
pub struct WrittenVideo {
    pub path: PathBuf,
    pub fourcc: Fourcc,
    pub frame_rate: FrameRate,
    pub dimensions: (u32, u32),
    pub frames: Vec<RgbImage>,
    pub finished: bool,
}

#[derive(Debug, Default)]
struct BackendState {
    unavailable: HashSet<Fourcc>,
    fail_write_at: Option<u64>,
    attempts: Vec<Fourcc>,
    videos: Vec<WrittenVideo>,
}

/// Writer backend storing frames in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriterBackend {
    state: Rc<RefCell<BackendState>>,
}

impl MemoryWriterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `open` fail for `fourcc`.
    pub fn with_unavailable(self, fourcc: Fourcc) -> Self {
        self.state.borrow_mut().unavailable.insert(fourcc);
        self
    }

    /// Makes writing frame `frame_number` (1-based) fail.
    pub fn with_write_failure_at(self, frame_number: u64) -> Self {
        self.state.borrow_mut().fail_write_at = Some(frame_number);
        self
    }

    /// Codecs passed to `open`, in order.
    pub fn attempts(&self) -> Vec<Fourcc> {
        self.state.borrow().attempts.clone()
    }

    /// Videos successfully opened, in order.
    pub fn videos(&self) -> Vec<WrittenVideo> {
        self.state.borrow().videos.clone()
    }

    pub fn last_video(&self) -> Option<WrittenVideo> {
        self.state.borrow().videos.last().cloned()
    }
}

impl WriterBackend for MemoryWriterBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(
        &self,
        path: &Path,
        fourcc: Fourcc,
        frame_rate: FrameRate,
        dimensions: (u32, u32),
    ) -> CoreResult<Box<dyn FrameWriter>> {
        let mut state = self.state.borrow_mut();
        state.attempts.push(fourcc);
        if state.unavailable.contains(&fourcc) {
            return Err(CoreError::EncoderUnavailable {
                fourcc: fourcc.to_string(),
                reason: "marked unavailable".to_string(),
            });
        }
        state.videos.push(WrittenVideo {
            path: path.to_path_buf(),
            fourcc,
            frame_rate,
            dimensions,
            frames: Vec::new(),
            finished: false,
        });
        Ok(Box::new(MemoryFrameWriter {
            state: Rc::clone(&self.state),
            slot: state.videos.len() - 1,
            fourcc,
            dimensions,
            frames_written: 0,
        }))
    }
}

struct MemoryFrameWriter {
    state: Rc<RefCell<BackendState>>,
    slot: usize,
    fourcc: Fourcc,
    dimensions: (u32, u32),
    frames_written: u64,
}

impl FrameWriter for MemoryFrameWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> CoreResult<()> {
        if frame.dimensions() != self.dimensions {
            return Err(CoreError::FrameWrite(format!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.dimensions.0,
                self.dimensions.1
            )));
        }
        let mut state = self.state.borrow_mut();
        if state.fail_write_at == Some(self.frames_written + 1) {
            return Err(CoreError::FrameWrite("injected write failure".to_string()));
        }
        state.videos[self.slot].frames.push(frame.clone());
        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> CoreResult<u64> {
        self.state.borrow_mut().videos[self.slot].finished = true;
        Ok(self.frames_written)
    }

    fn fourcc(&self) -> Fourcc {
        self.fourcc
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
