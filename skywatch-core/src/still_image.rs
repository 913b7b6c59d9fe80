//! Single-image annotation.
//!
//! Runs the detector once on a still image (downscaled by the same rule as
//! video frames), draws the detections at full resolution and saves the
//! result. The output format follows the output path's extension.

use crate::config::ProcessingConfig;
use crate::detection::{ClassNames, Detection, Detector};
use crate::error::{CoreError, CoreResult};
use crate::pipeline::detect_frame;
use crate::render::{AnnotationRenderer, AnnotationStyle};

use log::info;
use serde::Serialize;

use std::path::{Path, PathBuf};

/// Result of annotating one image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnnotation {
    pub detections: Vec<Detection>,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Annotates the image at `input_path` and writes it to `output_path`.
pub fn annotate_image(
    input_path: &Path,
    output_path: &Path,
    config: &ProcessingConfig,
    class_names: &ClassNames,
    style: &AnnotationStyle,
    detector: &mut dyn Detector,
) -> CoreResult<ImageAnnotation> {
    config.validate()?;

    let image = image::open(input_path)
        .map_err(|e| CoreError::SourceOpen {
            path: input_path.to_path_buf(),
            reason: e.to_string(),
        })?
        .to_rgb8();
    let (width, height) = image.dimensions();

    let detections = detect_frame(detector, &image, 1, config, class_names)?;

    let renderer = AnnotationRenderer::new(style.clone());
    let annotated = renderer.render(&image, &detections);
    annotated.save(output_path)?;

    info!(
        "Annotated {} ({width}x{height}): {} detections -> {}",
        input_path.display(),
        detections.len(),
        output_path.display()
    );

    Ok(ImageAnnotation {
        detections,
        output_path: output_path.to_path_buf(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProcessingConfigBuilder, SpeedMode};
    use crate::detection::{RawDetection, ScriptedDetector};
    use crate::geometry::BoundingBox;
    use image::{Rgb, RgbImage};

    #[test]
    fn annotates_and_saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scene.png");
        let output = dir.path().join("processed_scene.png");
        RgbImage::from_pixel(960, 540, Rgb([30, 30, 30]))
            .save(&input)
            .unwrap();

        // Fast preset: 960 wide -> inference at 480, scale 0.5
        let config = ProcessingConfigBuilder::new()
            .speed_mode(SpeedMode::Fast)
            .build()
            .unwrap();
        let mut detector = ScriptedDetector::constant(vec![RawDetection {
            bbox: [100.0, 100.0, 200.0, 200.0],
            confidence: 0.9,
            class_id: 1,
        }]);

        let result = annotate_image(
            &input,
            &output,
            &config,
            &ClassNames::default(),
            &AnnotationStyle::default(),
            &mut detector,
        )
        .unwrap();

        assert_eq!(detector.input_sizes(), &[(480, 270)]);
        assert_eq!((result.width, result.height), (960, 540));
        assert_eq!(result.detections.len(), 1);
        assert_eq!(
            result.detections[0].bounding_box,
            BoundingBox::new(200, 200, 400, 400)
        );
        assert_eq!(result.detections[0].class_label, "soldier");

        let saved = image::open(&output).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (960, 540));
        assert_eq!(*saved.get_pixel(200, 300), Rgb([255, 0, 0]));
    }

    #[test]
    fn missing_input_is_source_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = annotate_image(
            &dir.path().join("missing.png"),
            &dir.path().join("out.png"),
            &ProcessingConfig::default(),
            &ClassNames::default(),
            &AnnotationStyle::default(),
            &mut crate::detection::NullDetector,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::SourceOpen { .. }));
    }
}
