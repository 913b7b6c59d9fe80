//! Configuration structures and constants for the skywatch-core library.
//!
//! This module provides the run configuration: the speed/accuracy trade-off
//! (`ProcessingConfig`, usually built from a `SpeedMode` preset) and the
//! output options (`PipelineOptions`) covering codec choice, progress cadence
//! and annotation style.

mod builder;

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use builder::ProcessingConfigBuilder;

use crate::encoding::Fourcc;
use crate::error::{CoreError, CoreResult};
use crate::pipeline::CancellationToken;
use crate::render::AnnotationStyle;

// Default constants

/// Minimum detector confidence for a detection to be kept.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// IoU threshold passed to the detector's non-max suppression.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.4;

/// Frames between progress events.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 60;

/// Named speed/accuracy presets.
///
/// | Mode | Skip interval | Max inference width |
/// |---|---|---|
/// | `fast` | 3 | 480 |
/// | `normal` | 1 | 640 |
/// | `high_quality` | 0 | 1080 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    #[default]
    Fast,
    Normal,
    HighQuality,
}

impl SpeedMode {
    /// `(skip_interval, max_inference_dimension)` for this preset.
    pub fn preset(self) -> (u32, u32) {
        match self {
            SpeedMode::Fast => (3, 480),
            SpeedMode::Normal => (1, 640),
            SpeedMode::HighQuality => (0, 1080),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedMode::Fast => "fast",
            SpeedMode::Normal => "normal",
            SpeedMode::HighQuality => "high_quality",
        }
    }
}

impl fmt::Display for SpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fast" => Ok(SpeedMode::Fast),
            "normal" => Ok(SpeedMode::Normal),
            "high_quality" | "hq" => Ok(SpeedMode::HighQuality),
            other => Err(CoreError::Config(format!(
                "Unknown speed mode '{other}' (expected fast, normal or high_quality)"
            ))),
        }
    }
}

/// Speed/accuracy parameters for one run. Immutable once the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Frames skipped between inferences (0 = infer every frame)
    pub skip_interval: u32,

    /// Maximum width of the buffer handed to the detector
    pub max_inference_dimension: u32,

    /// Minimum confidence in [0, 1]
    pub confidence_threshold: f32,

    /// Non-max suppression IoU threshold in [0, 1]
    pub iou_threshold: f32,
}

impl ProcessingConfig {
    pub fn from_speed_mode(mode: SpeedMode) -> Self {
        let (skip_interval, max_inference_dimension) = mode.preset();
        Self {
            skip_interval,
            max_inference_dimension,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_inference_dimension == 0 {
            return Err(CoreError::Config(
                "max_inference_dimension must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(CoreError::Config(format!(
                "confidence_threshold {} is outside [0, 1]",
                self.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(CoreError::Config(format!(
                "iou_threshold {} is outside [0, 1]",
                self.iou_threshold
            )));
        }
        Ok(())
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::from_speed_mode(SpeedMode::default())
    }
}

/// Which detection counter is reported as the run's headline figure.
///
/// Both counters are always tracked in `PipelineStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionCountMode {
    /// Every drawn box counts, including boxes redrawn on skipped frames.
    #[default]
    PerFrameDrawn,
    /// Only detections produced by an inference call count.
    PerInference,
}

impl FromStr for DetectionCountMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_frame_drawn" | "drawn" => Ok(DetectionCountMode::PerFrameDrawn),
            "per_inference" | "inference" => Ok(DetectionCountMode::PerInference),
            other => Err(CoreError::Config(format!(
                "Unknown count mode '{other}' (expected per_frame_drawn or per_inference)"
            ))),
        }
    }
}

/// Output and reporting options for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub primary_codec: Fourcc,
    pub fallback_codec: Fourcc,

    /// Frames between progress events (0 disables periodic events; the
    /// final event is always sent)
    pub progress_interval: u64,

    pub count_mode: DetectionCountMode,

    pub style: AnnotationStyle,

    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            primary_codec: Fourcc::AVC1,
            fallback_codec: Fourcc::MP4V,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            count_mode: DetectionCountMode::default(),
            style: AnnotationStyle::default(),
            cancellation: None,
        }
    }
}

/// On-disk run configuration (JSON).
///
/// Every field is optional. Fields that are present override the speed-mode
/// preset; explicit command-line flags in turn override the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub speed_mode: Option<SpeedMode>,
    pub skip_interval: Option<u32>,
    pub max_inference_dimension: Option<u32>,
    pub confidence_threshold: Option<f32>,
    pub iou_threshold: Option<f32>,
    pub primary_codec: Option<Fourcc>,
    pub fallback_codec: Option<Fourcc>,
    pub progress_interval: Option<u64>,
    pub count_mode: Option<DetectionCountMode>,
    pub benign_class: Option<String>,
    pub classes: Option<Vec<String>>,
}

impl RunConfig {
    pub fn load(path: &Path) -> CoreResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: RunConfig = serde_json::from_str(&contents)?;
        // Surface bad values at load time rather than at run start
        config.apply_processing(ProcessingConfigBuilder::new()).build()?;
        Ok(config)
    }

    /// Applies the processing overrides present in this file to `builder`.
    pub fn apply_processing(&self, mut builder: ProcessingConfigBuilder) -> ProcessingConfigBuilder {
        if let Some(mode) = self.speed_mode {
            builder = builder.speed_mode(mode);
        }
        if let Some(skip) = self.skip_interval {
            builder = builder.skip_interval(skip);
        }
        if let Some(max) = self.max_inference_dimension {
            builder = builder.max_inference_dimension(max);
        }
        if let Some(conf) = self.confidence_threshold {
            builder = builder.confidence_threshold(conf);
        }
        if let Some(iou) = self.iou_threshold {
            builder = builder.iou_threshold(iou);
        }
        builder
    }

    /// Applies the output overrides present in this file to `options`.
    pub fn apply_options(&self, options: &mut PipelineOptions) {
        if let Some(codec) = self.primary_codec {
            options.primary_codec = codec;
        }
        if let Some(codec) = self.fallback_codec {
            options.fallback_codec = codec;
        }
        if let Some(interval) = self.progress_interval {
            options.progress_interval = interval;
        }
        if let Some(mode) = self.count_mode {
            options.count_mode = mode;
        }
        if let Some(benign) = &self.benign_class {
            options.style.benign_label = benign.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_speed_modes() {
        let fast = ProcessingConfig::from_speed_mode(SpeedMode::Fast);
        assert_eq!((fast.skip_interval, fast.max_inference_dimension), (3, 480));

        let normal = ProcessingConfig::from_speed_mode(SpeedMode::Normal);
        assert_eq!((normal.skip_interval, normal.max_inference_dimension), (1, 640));

        let hq = ProcessingConfig::from_speed_mode(SpeedMode::HighQuality);
        assert_eq!((hq.skip_interval, hq.max_inference_dimension), (0, 1080));
        assert_eq!(hq.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(hq.iou_threshold, DEFAULT_IOU_THRESHOLD);
    }

    #[test]
    fn speed_mode_parses_common_spellings() {
        assert_eq!("fast".parse::<SpeedMode>().unwrap(), SpeedMode::Fast);
        assert_eq!("Normal".parse::<SpeedMode>().unwrap(), SpeedMode::Normal);
        assert_eq!(
            "high-quality".parse::<SpeedMode>().unwrap(),
            SpeedMode::HighQuality
        );
        assert!("turbo".parse::<SpeedMode>().is_err());
        assert_eq!(SpeedMode::HighQuality.to_string(), "high_quality");
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = ProcessingConfig::default();
        assert!(config.validate().is_ok());

        config.max_inference_dimension = 0;
        assert!(config.validate().is_err());

        config = ProcessingConfig::default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config = ProcessingConfig::default();
        config.iou_threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn run_config_overrides_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{
                "speed_mode": "normal",
                "skip_interval": 5,
                "primary_codec": "mp4v",
                "count_mode": "per_inference",
                "benign_class": "friendly"
            }"#,
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        let processing = config
            .apply_processing(ProcessingConfigBuilder::new())
            .build()
            .unwrap();
        assert_eq!(processing.skip_interval, 5);
        // Not in the file, so the normal preset applies
        assert_eq!(processing.max_inference_dimension, 640);

        let mut options = PipelineOptions::default();
        config.apply_options(&mut options);
        assert_eq!(options.primary_codec.as_str(), "mp4v");
        assert_eq!(options.fallback_codec, Fourcc::MP4V);
        assert_eq!(options.count_mode, DetectionCountMode::PerInference);
        assert_eq!(options.progress_interval, DEFAULT_PROGRESS_INTERVAL);
        assert_eq!(options.style.benign_label, "friendly");
    }

    #[test]
    fn run_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"max_inference_dimension": 0}"#).unwrap();
        assert!(matches!(RunConfig::load(&path), Err(CoreError::Config(_))));

        fs::write(&path, r#"{"skip": 2}"#).unwrap();
        assert!(matches!(RunConfig::load(&path), Err(CoreError::Json(_))));
    }
}
