//! 1:1 selection geometry.
//!
//! The side is `min(|dx|, |dy|, room_x, room_y)` where `room_*` is the distance
//! from the anchor to the image edge in the drag direction. Intersecting all four
//! limits at once yields an exact square that never leaves the image.

use crate::domain::model::{CropRect, Point};

/// Live square corner for a drag from `start` towards `current`
pub fn constrain(start: Point, current: Point, width: u32, height: u32) -> Point {
    let (w, h) = (width as f64, height as f64);
    let dx = current.x - start.x;
    let dy = current.y - start.y;

    let room_x = if dx >= 0.0 { w - start.x } else { start.x };
    let room_y = if dy >= 0.0 { h - start.y } else { start.y };

    let side = dx.abs().min(dy.abs()).min(room_x).min(room_y).max(0.0);

    Point::new(
        start.x + side.copysign(signum_or_positive(dx)),
        start.y + side.copysign(signum_or_positive(dy)),
    )
}

/// Integer square committed on release, or `None` when it has no area.
///
/// The anchor and release point are truncated to whole pixels before the
/// side is derived, so the clamp works on the same integers the rectangle uses.
pub fn commit(start: Point, current: Point, width: u32, height: u32) -> Option<CropRect> {
    let ax = to_pixel(start.x, width);
    let ay = to_pixel(start.y, height);
    let ex = to_pixel(current.x, width);
    let ey = to_pixel(current.y, height);

    let dx = ex - ax;
    let dy = ey - ay;

    let room_x = if dx >= 0 { width as i64 - ax } else { ax };
    let room_y = if dy >= 0 { height as i64 - ay } else { ay };

    let side = dx.abs().min(dy.abs()).min(room_x).min(room_y);
    if side <= 0 {
        return None;
    }

    let bx = if dx >= 0 { ax + side } else { ax - side };
    let by = if dy >= 0 { ay + side } else { ay - side };

    CropRect::from_corners(
        (ax as u32, ay as u32),
        (bx as u32, by as u32),
        width,
        height,
    )
    .ok()
}

fn signum_or_positive(delta: f64) -> f64 {
    if delta < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Truncate onto `[0, bound]`
fn to_pixel(value: f64, bound: u32) -> i64 {
    value.clamp(0.0, bound as f64) as i64
}
