//! Display ↔ source coordinate mapping for a fitted preview

use serde::Serialize;

use crate::domain::model::{CropRect, Point};
use crate::error::{CropperError, CropperResult};
use crate::selection::SelectionMessage;

/// How a source frame is fitted and centered on a preview canvas.
///
/// `scale = min(canvas_w / source_w, canvas_h / source_h)` and the scaled image
/// is centered, so `offset + scale * source_dim <= canvas_dim` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub display_width: f64,
    pub display_height: f64,
    pub source_width: u32,
    pub source_height: u32,
}

impl DisplayTransform {
    /// Fit a `source_width`x`source_height` frame into the canvas
    pub fn fit(source_width: u32, source_height: u32, canvas_width: u32, canvas_height: u32) -> CropperResult<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(CropperError::InvalidDimensions {
                dimension: "source".to_string(),
                value: format!("{}x{}", source_width, source_height),
                reason: "video has no pixels".to_string(),
            });
        }
        if canvas_width == 0 || canvas_height == 0 {
            return Err(CropperError::InvalidDimensions {
                dimension: "canvas".to_string(),
                value: format!("{}x{}", canvas_width, canvas_height),
                reason: "preview surface has no pixels".to_string(),
            });
        }

        let (sw, sh) = (source_width as f64, source_height as f64);
        let (cw, ch) = (canvas_width as f64, canvas_height as f64);

        let scale = (cw / sw).min(ch / sh);
        let display_width = sw * scale;
        let display_height = sh * scale;

        Ok(Self {
            scale,
            offset_x: ((cw - display_width) / 2.0).max(0.0),
            offset_y: ((ch - display_height) / 2.0).max(0.0),
            display_width,
            display_height,
            source_width,
            source_height,
        })
    }

    /// Integer size of the rendered preview image
    pub fn rendered_size(&self) -> (u32, u32) {
        (
            (self.display_width.round() as u32).max(1),
            (self.display_height.round() as u32).max(1),
        )
    }

    /// True when the point lies on the displayed image (edges included)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.offset_x
            && point.x <= self.offset_x + self.display_width
            && point.y >= self.offset_y
            && point.y <= self.offset_y + self.display_height
    }

    /// Display point to source pixels; points off the image are clamped to its edge first
    pub fn to_source(&self, point: Point) -> Point {
        let x = point.x.clamp(self.offset_x, self.offset_x + self.display_width);
        let y = point.y.clamp(self.offset_y, self.offset_y + self.display_height);

        Point::new(
            ((x - self.offset_x) / self.scale).clamp(0.0, self.source_width as f64),
            ((y - self.offset_y) / self.scale).clamp(0.0, self.source_height as f64),
        )
    }

    /// Source pixels to display point
    pub fn to_display(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.offset_x,
            point.y * self.scale + self.offset_y,
        )
    }

    /// Display-space corners of a committed rectangle, for drawing the overlay
    pub fn rect_to_display(&self, rect: &CropRect) -> (Point, Point) {
        (
            self.to_display(Point::new(rect.x1() as f64, rect.y1() as f64)),
            self.to_display(Point::new(rect.x2() as f64, rect.y2() as f64)),
        )
    }

    /// Translate a pointer event on the canvas into a selection message.
    ///
    /// A press that misses the image starts nothing; drags and releases are
    /// clamped onto the image.
    pub fn translate(&self, event: PointerEvent) -> Option<SelectionMessage> {
        match event {
            PointerEvent::Press(p) if self.contains(p) => Some(SelectionMessage::Start(self.to_source(p))),
            PointerEvent::Press(_) => None,
            PointerEvent::Drag(p) => Some(SelectionMessage::Update(self.to_source(p))),
            PointerEvent::Release(p) => Some(SelectionMessage::Commit(self.to_source(p))),
        }
    }
}

/// Raw pointer input in display coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press(Point),
    Drag(Point),
    Release(Point),
}
