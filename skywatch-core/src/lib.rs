//! Core library for adaptive video annotation.
//!
//! Decodes a video, runs an object detector on a subset of frames at reduced
//! resolution, draws the detections onto every frame at full resolution and
//! encodes the annotated result. Frame skipping and downscaled inference
//! trade accuracy for throughput; detections from the last inferred frame
//! are reused on skipped frames.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use skywatch_core::config::{PipelineOptions, ProcessingConfig, SpeedMode};
//! use skywatch_core::detection::ReplayDetector;
//! use skywatch_core::run_pipeline;
//! use std::path::Path;
//!
//! let config = ProcessingConfig::from_speed_mode(SpeedMode::Normal);
//! let mut detector = ReplayDetector::from_file(Path::new("detections.json")).unwrap();
//!
//! let stats = run_pipeline(
//!     Path::new("input.mp4"),
//!     Path::new("processed_input.mp4"),
//!     config,
//!     &mut detector,
//!     PipelineOptions::default(),
//! )
//! .unwrap();
//! println!("{} frames, {} inferred", stats.frames_read, stats.frames_inferred);
//! ```

pub mod config;
pub mod detection;
pub mod encoding;
pub mod error;
pub mod events;
pub mod geometry;
pub mod media;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod still_image;
pub mod utils;

// Re-exports for public API
pub use config::{
    DetectionCountMode, PipelineOptions, ProcessingConfig, ProcessingConfigBuilder, RunConfig,
    SpeedMode,
};
pub use detection::{ClassNames, Detection, Detector, RawDetection};
pub use encoding::{Fourcc, open_writer};
pub use error::{CoreError, CoreResult};
pub use geometry::{BoundingBox, InferenceScale, downscale_box, downscale_dimensions, rescale_box};
pub use media::{VideoProperties, probe_video};
pub use pipeline::{AnnotationPipeline, CancellationToken, PipelineStats, run_pipeline};
pub use render::{AnnotationRenderer, AnnotationStyle};
pub use scheduler::{FrameAction, FrameScheduler, should_infer};
pub use still_image::{ImageAnnotation, annotate_image};
pub use utils::{format_bytes, format_duration};
