// ============================================================================
// skywatch-core/src/render/mod.rs
// ============================================================================
//
// ANNOTATION RENDERER
//
// Draws detections onto frames: a rectangle outline per detection plus a
// filled label box directly above the rectangle's top edge holding
// "<label>: <confidence>". Colour is two-way: the benign class is drawn in
// one colour and every other class in another.
//
// Rendering is a pure function of (frame, detections, style). Boxes that
// extend past the frame are clipped while drawing; the detections themselves
// are never modified.
//
// KEY COMPONENTS:
// - AnnotationStyle: Colours, benign label, line thickness and text scale
// - AnnotationRenderer: Draws a detection slice onto a frame

pub mod font;

use crate::detection::Detection;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

/// Label treated as benign when no other is configured.
pub const DEFAULT_BENIGN_LABEL: &str = "civilian";

/// Visual parameters for annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    /// Detections with this label use `benign_color`
    pub benign_label: String,
    pub benign_color: [u8; 3],
    pub flagged_color: [u8; 3],
    pub text_color: [u8; 3],
    /// Outline thickness in pixels
    pub box_thickness: u32,
    /// Integer scale applied to the 5x7 label font
    pub text_scale: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            benign_label: DEFAULT_BENIGN_LABEL.to_string(),
            benign_color: [0, 255, 0],
            flagged_color: [255, 0, 0],
            text_color: [255, 255, 255],
            box_thickness: 2,
            text_scale: 2,
        }
    }
}

/// Formats the label drawn above a detection, e.g. `"soldier: 0.87"`.
pub fn label_text(detection: &Detection) -> String {
    format!("{}: {:.2}", detection.class_label, detection.confidence)
}

/// Draws detections onto frames with a fixed style.
#[derive(Debug, Clone, Default)]
pub struct AnnotationRenderer {
    style: AnnotationStyle,
}

impl AnnotationRenderer {
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    /// Colour used for a detection with `label`.
    pub fn color_for(&self, label: &str) -> Rgb<u8> {
        if label == self.style.benign_label {
            Rgb(self.style.benign_color)
        } else {
            Rgb(self.style.flagged_color)
        }
    }

    /// Returns an annotated copy of `frame`. The input is left untouched.
    pub fn render(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut out = frame.clone();
        self.render_into(&mut out, detections);
        out
    }

    /// Annotates `frame` in place.
    pub fn render_into(&self, frame: &mut RgbImage, detections: &[Detection]) {
        for detection in detections {
            let color = self.color_for(&detection.class_label);
            self.draw_box(frame, detection, color);
            self.draw_label(frame, detection, color);
        }
    }

    fn draw_box(&self, frame: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
        let b = &detection.bounding_box;
        let (left, right) = (b.x1.min(b.x2), b.x1.max(b.x2));
        let (top, bottom) = (b.y1.min(b.y2), b.y1.max(b.y2));

        // Corners are inclusive, so a degenerate box still draws a point
        let width = i64::from(right) - i64::from(left) + 1;
        let height = i64::from(bottom) - i64::from(top) + 1;

        // Concentric outlines growing inwards
        for inset in 0..i64::from(self.style.box_thickness.max(1)) {
            let w = width - 2 * inset;
            let h = height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(left + inset as i32, top + inset as i32).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(frame, rect, color);
        }
    }

    fn draw_label(&self, frame: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
        let b = &detection.bounding_box;
        let left = b.x1.min(b.x2);
        let top = b.y1.min(b.y2);

        let text = label_text(detection);
        let scale = self.style.text_scale.max(1);
        let pad = scale;
        let bg_width = font::text_width(&text, scale) + 2 * pad;
        let bg_height = font::text_height(scale) + 2 * pad;

        // Sits on the box's top edge; clipped when the box is near the top
        let bg_top = top - bg_height as i32;
        draw_filled_rect_mut(frame, Rect::at(left, bg_top).of_size(bg_width, bg_height), color);

        font::draw_text(
            frame,
            &text,
            left + pad as i32,
            bg_top + pad as i32,
            scale,
            Rgb(self.style.text_color),
        );
    }
}
