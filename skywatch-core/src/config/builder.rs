// ============================================================================
// skywatch-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for ProcessingConfig
//
// Starts from a speed-mode preset and applies individual overrides. Selecting
// a speed mode resets the skip interval and inference width to that preset
// but keeps any thresholds already set, so the order of overrides from a
// config file and the command line does not matter for thresholds.
//
// AI-ASSISTANT-INFO: Builder pattern implementation for ProcessingConfig

// ---- Internal crate imports ----
use super::{ProcessingConfig, SpeedMode};
use crate::error::CoreResult;

/// Builder for creating validated `ProcessingConfig` instances.
///
/// # Examples
///
/// ```rust
/// use skywatch_core::config::{ProcessingConfigBuilder, SpeedMode};
///
/// let config = ProcessingConfigBuilder::new()
///     .speed_mode(SpeedMode::Normal)
///     .confidence_threshold(0.6)
///     .build()
///     .unwrap();
/// assert_eq!(config.skip_interval, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ProcessingConfigBuilder {
    speed_mode: SpeedMode,
    skip_interval: Option<u32>,
    max_inference_dimension: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

impl ProcessingConfigBuilder {
    pub fn new() -> Self {
        Self {
            speed_mode: SpeedMode::default(),
            skip_interval: None,
            max_inference_dimension: None,
            confidence_threshold: None,
            iou_threshold: None,
        }
    }

    /// Selects the preset. Clears earlier skip/dimension overrides.
    pub fn speed_mode(mut self, mode: SpeedMode) -> Self {
        self.speed_mode = mode;
        self.skip_interval = None;
        self.max_inference_dimension = None;
        self
    }

    pub fn skip_interval(mut self, skip_interval: u32) -> Self {
        self.skip_interval = Some(skip_interval);
        self
    }

    pub fn max_inference_dimension(mut self, max_dimension: u32) -> Self {
        self.max_inference_dimension = Some(max_dimension);
        self
    }

    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }

    pub fn iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = Some(threshold);
        self
    }

    /// Resolves the preset plus overrides and validates the result.
    pub fn build(self) -> CoreResult<ProcessingConfig> {
        let mut config = ProcessingConfig::from_speed_mode(self.speed_mode);
        if let Some(skip) = self.skip_interval {
            config.skip_interval = skip;
        }
        if let Some(max) = self.max_inference_dimension {
            config.max_inference_dimension = max;
        }
        if let Some(conf) = self.confidence_threshold {
            config.confidence_threshold = conf;
        }
        if let Some(iou) = self.iou_threshold {
            config.iou_threshold = iou;
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for ProcessingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn defaults_to_fast_preset() {
        let config = ProcessingConfigBuilder::new().build().unwrap();
        assert_eq!(config, ProcessingConfig::from_speed_mode(SpeedMode::Fast));
    }

    #[test]
    fn overrides_apply_on_top_of_preset() {
        let config = ProcessingConfigBuilder::new()
            .speed_mode(SpeedMode::HighQuality)
            .skip_interval(2)
            .iou_threshold(0.6)
            .build()
            .unwrap();
        assert_eq!(config.skip_interval, 2);
        assert_eq!(config.max_inference_dimension, 1080);
        assert_eq!(config.iou_threshold, 0.6);
    }

    #[test]
    fn speed_mode_resets_structural_overrides_only() {
        let config = ProcessingConfigBuilder::new()
            .skip_interval(9)
            .confidence_threshold(0.8)
            .speed_mode(SpeedMode::Normal)
            .build()
            .unwrap();
        assert_eq!(config.skip_interval, 1);
        assert_eq!(config.confidence_threshold, 0.8);
    }

    #[test]
    fn build_validates() {
        let err = ProcessingConfigBuilder::new()
            .max_inference_dimension(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
