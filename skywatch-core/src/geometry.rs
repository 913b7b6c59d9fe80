// ============================================================================
// skywatch-core/src/geometry.rs
// ============================================================================
//
// GEOMETRY: Inference Resolution Mapping
//
// Frames are downscaled before inference so that their width does not exceed
// the configured maximum. Detector output is expressed in the downscaled
// buffer's pixel space and must be mapped back to the original resolution
// before it is cached or drawn.
//
// Boxes are never clamped here. A box that extends past the frame is passed
// through unchanged and clipped by the renderer at draw time.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in original-resolution pixel coordinates.
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right corner.
/// The ordering is not enforced; detectors occasionally emit inverted boxes
/// and the renderer normalises them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).abs()
    }
}

/// The dimensions a frame is resized to before inference, and the factor
/// that relates them to the original frame (`inference = original * scale`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceScale {
    pub scale_factor: f64,
    pub width: u32,
    pub height: u32,
}

impl InferenceScale {
    /// Whether the frame is passed to the detector at its original size.
    pub fn is_identity(&self) -> bool {
        self.scale_factor == 1.0
    }
}

/// Computes the inference dimensions for a `width` x `height` frame.
///
/// Frames no wider than `max_dimension` are left alone; wider frames are
/// shrunk to exactly `max_dimension` pixels wide with the height scaled by the
/// same factor. Never upscales. A zero `max_dimension` is treated as "no
/// limit" since the config layer rejects it before a run starts.
pub fn downscale_dimensions(width: u32, height: u32, max_dimension: u32) -> InferenceScale {
    if max_dimension == 0 || width <= max_dimension {
        return InferenceScale {
            scale_factor: 1.0,
            width,
            height,
        };
    }

    let scale_factor = f64::from(max_dimension) / f64::from(width);
    let scaled_height = (f64::from(height) * scale_factor).round().max(1.0) as u32;

    InferenceScale {
        scale_factor,
        width: max_dimension,
        height: scaled_height,
    }
}

/// Maps a box from inference space back to original-resolution pixels.
pub fn rescale_box(raw: [f32; 4], scale_factor: f64) -> BoundingBox {
    if scale_factor == 1.0 {
        return BoundingBox::new(
            raw[0].round() as i32,
            raw[1].round() as i32,
            raw[2].round() as i32,
            raw[3].round() as i32,
        );
    }

    let map = |v: f32| (f64::from(v) / scale_factor).round() as i32;
    BoundingBox::new(map(raw[0]), map(raw[1]), map(raw[2]), map(raw[3]))
}

/// Maps an original-resolution box into inference space.
pub fn downscale_box(bbox: &BoundingBox, scale_factor: f64) -> [f32; 4] {
    let map = |v: i32| (f64::from(v) * scale_factor) as f32;
    [map(bbox.x1), map(bbox.y1), map(bbox.x2), map(bbox.y2)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_within_limit_are_not_resized() {
        let scale = downscale_dimensions(640, 480, 640);
        assert!(scale.is_identity());
        assert_eq!((scale.width, scale.height), (640, 480));

        // Never upscales
        let scale = downscale_dimensions(320, 240, 1080);
        assert_eq!(scale.scale_factor, 1.0);
        assert_eq!((scale.width, scale.height), (320, 240));
    }

    #[test]
    fn full_hd_frame_downscales_to_fast_preset() {
        let scale = downscale_dimensions(1920, 1080, 480);
        assert!((scale.scale_factor - 0.25).abs() < 1e-12);
        assert_eq!(scale.width, 480);
        assert_eq!(scale.height, 270);
    }

    #[test]
    fn odd_aspect_ratios_round_height() {
        // 721 * 0.5 = 360.5 -> 361
        let scale = downscale_dimensions(1280, 721, 640);
        assert_eq!(scale.width, 640);
        assert_eq!(scale.height, 361);

        // Very wide strips keep at least one row
        let scale = downscale_dimensions(10_000, 1, 100);
        assert_eq!(scale.height, 1);
    }

    #[test]
    fn rescale_inverts_downscale() {
        let scale = 0.25;
        let raw = [100.0_f32, 50.0, 200.0, 150.0];
        let bbox = rescale_box(raw, scale);
        assert_eq!(bbox, BoundingBox::new(400, 200, 800, 600));
        assert_eq!(downscale_box(&bbox, scale), raw);
    }

    #[test]
    fn rescale_round_trip_is_within_one_pixel() {
        let boxes = [
            BoundingBox::new(0, 0, 1, 1),
            BoundingBox::new(17, 33, 1001, 719),
            BoundingBox::new(-25, -7, 3839, 2159),
            BoundingBox::new(1919, 1079, 1920, 1080),
            BoundingBox::new(333, 777, 334, 778),
        ];
        for step in 1..=200 {
            let scale = f64::from(step) / 200.0;
            for original in &boxes {
                let back = rescale_box(downscale_box(original, scale), scale);
                for (got, want) in [
                    (back.x1, original.x1),
                    (back.y1, original.y1),
                    (back.x2, original.x2),
                    (back.y2, original.y2),
                ] {
                    assert!(
                        (got - want).abs() <= 1,
                        "scale {scale}: {original:?} came back as {back:?}"
                    );
                }
            }
        }

        // Scales produced by the presets themselves
        for (width, height, max_dimension) in [(1280, 720, 480), (1920, 1080, 640), (4096, 2160, 1080)] {
            let scale = downscale_dimensions(width, height, max_dimension).scale_factor;
            let original = BoundingBox::new(17, 33, 1001, 719);
            let back = rescale_box(downscale_box(&original, scale), scale);
            assert!((back.x1 - original.x1).abs() <= 1);
            assert!((back.y2 - original.y2).abs() <= 1);
        }
    }

    #[test]
    fn identity_scale_only_rounds() {
        let bbox = rescale_box([10.4, 10.6, -3.2, 2000.5], 1.0);
        assert_eq!(bbox, BoundingBox::new(10, 11, -3, 2001));
    }

    #[test]
    fn out_of_range_boxes_pass_through() {
        let bbox = rescale_box([-20.0, -10.0, 700.0, 500.0], 0.5);
        assert_eq!(bbox, BoundingBox::new(-40, -20, 1400, 1000));
    }
}
