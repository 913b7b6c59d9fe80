// ============================================================================
// skywatch-core/src/detection/mod.rs
// ============================================================================
//
// DETECTION: Detector Interface and Detection Types
//
// The object detector is an external collaborator. This module defines the
// trait the pipeline calls, the raw output it expects, and the labelled,
// original-resolution `Detection` that everything downstream works with.
//
// KEY COMPONENTS:
// - RawDetection: Detector output in inference-buffer coordinates
// - Detection: Rescaled, labelled detection (immutable once built)
// - ClassNames: class id -> label lookup fixed for a run
// - Detector: Trait implemented by model backends and test doubles
//
// AI-ASSISTANT-INFO: Detector trait and detection types

pub mod cache;
pub mod detector;

pub use cache::DetectionCache;
pub use detector::{NullDetector, ReplayDetector, ScriptedDetector};

use crate::error::{CoreError, CoreResult};
use crate::geometry::{BoundingBox, rescale_box};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Default class list, indexed by class id.
pub const DEFAULT_CLASS_NAMES: &[&str] = &["civilian", "soldier"];

/// A detection as returned by the detector, before rescaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// `[x1, y1, x2, y2]` in the pixel space of the buffer passed to the detector.
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: u32,
}

/// A labelled detection in original-resolution coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
    pub class_label: String,
}

impl Detection {
    /// Rescales a raw detection by `scale_factor` and resolves its label.
    pub fn from_raw(raw: &RawDetection, scale_factor: f64, class_names: &ClassNames) -> Self {
        Self {
            bounding_box: rescale_box(raw.bbox, scale_factor),
            confidence: raw.confidence.clamp(0.0, 1.0),
            class_id: raw.class_id,
            class_label: class_names.label(raw.class_id),
        }
    }
}

/// Fixed mapping from class id to human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNames(Vec<String>);

impl ClassNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Label for `class_id`, or `"Class <id>"` when the id is not known.
    pub fn label(&self, class_id: u32) -> String {
        self.0
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("Class {class_id}"))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_NAMES.iter().copied())
    }
}

impl FromStr for ClassNames {
    type Err = CoreError;

    /// Parses a comma-separated list; position in the list is the class id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let names: Vec<String> = s.split(',').map(|n| n.trim().to_string()).collect();
        if names.iter().any(String::is_empty) {
            return Err(CoreError::Config(format!(
                "Class list '{s}' contains an empty name"
            )));
        }
        Ok(Self(names))
    }
}

impl fmt::Display for ClassNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// An object detector.
///
/// `infer` receives a frame that has already been downscaled by the pipeline
/// and must return boxes in that frame's pixel space. Implementations are
/// expected to apply the confidence and IoU (non-max suppression) thresholds
/// themselves.
pub trait Detector {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn infer(
        &mut self,
        frame: &RgbImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> CoreResult<Vec<RawDetection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn infer(
        &mut self,
        frame: &RgbImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> CoreResult<Vec<RawDetection>> {
        (**self).infer(frame, confidence_threshold, iou_threshold)
    }
}
