// ============================================================================
// skywatch-core/src/detection/detector.rs
// ============================================================================
//
// BUNDLED DETECTORS
//
// Model-free detector implementations. `NullDetector` and `ReplayDetector`
// let the pipeline run end to end without a neural network (dry runs, demos,
// and replaying detections recorded elsewhere). `ScriptedDetector` is a
// closure-driven double for tests.

use super::{Detector, RawDetection};
use crate::error::{CoreError, CoreResult};

use image::RgbImage;
use log::debug;

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// Detector that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl Detector for NullDetector {
    fn name(&self) -> &str {
        "null"
    }

    fn infer(&mut self, _frame: &RgbImage, _conf: f32, _iou: f32) -> CoreResult<Vec<RawDetection>> {
        Ok(Vec::new())
    }
}

/// Replays pre-recorded detection sets, one per call.
///
/// The recording is a JSON array with one entry per inference call, each entry
/// being an array of `{"bbox": [x1, y1, x2, y2], "confidence": f, "class_id": n}`
/// objects in inference-buffer coordinates. Once the recording is exhausted
/// every further call returns no detections. Entries below the confidence
/// threshold passed to `infer` are dropped.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    frames: VecDeque<Vec<RawDetection>>,
    calls: u64,
}

impl ReplayDetector {
    pub fn new(frames: Vec<Vec<RawDetection>>) -> Self {
        Self {
            frames: frames.into(),
            calls: 0,
        }
    }

    /// Loads a recording from a JSON file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!(
                "Failed to read detection recording {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        let frames: Vec<Vec<RawDetection>> = serde_json::from_str(json)?;
        Ok(Self::new(frames))
    }

    /// Number of recorded sets not yet replayed.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    /// Number of `infer` calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Detector for ReplayDetector {
    fn name(&self) -> &str {
        "replay"
    }

    fn infer(
        &mut self,
        _frame: &RgbImage,
        confidence_threshold: f32,
        _iou_threshold: f32,
    ) -> CoreResult<Vec<RawDetection>> {
        self.calls += 1;
        let Some(set) = self.frames.pop_front() else {
            debug!("Replay recording exhausted at call {}", self.calls);
            return Ok(Vec::new());
        };
        Ok(set
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect())
    }
}

type InferFn = dyn FnMut(u64, &RgbImage) -> CoreResult<Vec<RawDetection>>;

/// Detector driven by a closure receiving the 1-based call number and the
/// frame. Records the size of every frame it was given.
pub struct ScriptedDetector {
    script: Box<InferFn>,
    calls: u64,
    input_sizes: Vec<(u32, u32)>,
}

impl ScriptedDetector {
    pub fn new<F>(script: F) -> Self
    where
        F: FnMut(u64, &RgbImage) -> CoreResult<Vec<RawDetection>> + 'static,
    {
        Self {
            script: Box::new(script),
            calls: 0,
            input_sizes: Vec::new(),
        }
    }

    /// Returns the same detections on every call.
    pub fn constant(detections: Vec<RawDetection>) -> Self {
        Self::new(move |_, _| Ok(detections.clone()))
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// `(width, height)` of each frame passed to `infer`, in call order.
    pub fn input_sizes(&self) -> &[(u32, u32)] {
        &self.input_sizes
    }
}

impl std::fmt::Debug for ScriptedDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedDetector")
            .field("calls", &self.calls)
            .field("input_sizes", &self.input_sizes)
            .finish_non_exhaustive()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn infer(&mut self, frame: &RgbImage, _conf: f32, _iou: f32) -> CoreResult<Vec<RawDetection>> {
        self.calls += 1;
        self.input_sizes.push(frame.dimensions());
        (self.script)(self.calls, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> RgbImage {
        RgbImage::new(4, 4)
    }

    #[test]
    fn replay_returns_sets_in_order_then_empty() {
        let json = r#"[
            [{"bbox": [1, 2, 3, 4], "confidence": 0.9, "class_id": 0}],
            [],
            [{"bbox": [5, 6, 7, 8], "confidence": 0.3, "class_id": 1},
             {"bbox": [9, 9, 20, 20], "confidence": 0.7, "class_id": 1}]
        ]"#;
        let mut detector = ReplayDetector::from_json(json).unwrap();
        assert_eq!(detector.remaining(), 3);

        let first = detector.infer(&frame(), 0.5, 0.4).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].bbox, [1.0, 2.0, 3.0, 4.0]);

        assert!(detector.infer(&frame(), 0.5, 0.4).unwrap().is_empty());

        // Low-confidence entry is filtered out
        let third = detector.infer(&frame(), 0.5, 0.4).unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].confidence, 0.7);

        assert!(detector.infer(&frame(), 0.5, 0.4).unwrap().is_empty());
        assert_eq!(detector.calls(), 4);
    }

    #[test]
    fn replay_rejects_malformed_json() {
        let err = ReplayDetector::from_json(r#"{"not": "a list"}"#).unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
    }

    #[test]
    fn scripted_detector_records_inputs() {
        let mut detector = ScriptedDetector::new(|call, _| {
            Ok(vec![RawDetection {
                bbox: [0.0, 0.0, call as f32, call as f32],
                confidence: 1.0,
                class_id: 0,
            }])
        });
        let out = detector.infer(&RgbImage::new(8, 6), 0.5, 0.4).unwrap();
        assert_eq!(out[0].bbox[2], 1.0);
        detector.infer(&RgbImage::new(4, 3), 0.5, 0.4).unwrap();
        assert_eq!(detector.input_sizes(), &[(8, 6), (4, 3)]);
    }

    #[test]
    fn null_detector_is_empty() {
        assert!(NullDetector.infer(&frame(), 0.0, 0.0).unwrap().is_empty());
    }
}
