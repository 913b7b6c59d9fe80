// ============================================================================
// skywatch-core/src/scheduler.rs
// ============================================================================
//
// FRAME SCHEDULER: Infer-or-Reuse Policy
//
// With a skip interval of N, inference runs on one frame out of every N + 1
// and the remaining frames reuse the most recent detections. Frame indices are
// 1-based, so frame 1 is always inferred and the cache is populated before
// any reuse can happen.

use serde::Serialize;

/// What the pipeline does with a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameAction {
    /// Run the detector on this frame.
    Infer,
    /// Draw the cached detections from the last inferred frame.
    Reuse,
}

/// Returns true if `frame_index` (1-based) should be sent to the detector.
pub fn should_infer(frame_index: u64, skip_interval: u32) -> bool {
    if skip_interval == 0 || frame_index <= 1 {
        return true;
    }
    frame_index % (u64::from(skip_interval) + 1) == 1
}

/// Fixed skip policy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameScheduler {
    skip_interval: u32,
}

impl FrameScheduler {
    pub fn new(skip_interval: u32) -> Self {
        Self { skip_interval }
    }

    pub fn skip_interval(&self) -> u32 {
        self.skip_interval
    }

    pub fn decide(&self, frame_index: u64) -> FrameAction {
        if should_infer(frame_index, self.skip_interval) {
            FrameAction::Infer
        } else {
            FrameAction::Reuse
        }
    }

    /// Number of frames that will be inferred in a stream of `total_frames`.
    pub fn expected_inferences(&self, total_frames: u64) -> u64 {
        if total_frames == 0 {
            return 0;
        }
        let period = u64::from(self.skip_interval) + 1;
        total_frames.div_ceil(period)
    }
}
