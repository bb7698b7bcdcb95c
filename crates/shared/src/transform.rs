//! Pure mapping between image-space (natural pixels of the background
//! image) and screen-space (container-relative pixels after scale/offset).
//!
//! The frontend places the image with `translate(offset) scale(scale)` and
//! `transform-origin: 0 0`, which is exactly `image_to_screen` below.

use crate::models::{Point, Size};
use crate::viewport::ViewportState;

/// Map a natural-pixel image coordinate onto the screen.
pub fn image_to_screen(pt: Point, state: &ViewportState) -> Point {
    Point::new(
        pt.x * state.scale + state.offset_x,
        pt.y * state.scale + state.offset_y,
    )
}

/// Inverse of [`image_to_screen`].
pub fn screen_to_image(pt: Point, state: &ViewportState) -> Point {
    Point::new(
        (pt.x - state.offset_x) / state.scale,
        (pt.y - state.offset_y) / state.scale,
    )
}

/// Convert a 0–100 percentage position to natural image pixels.
pub fn percent_to_image(pct: Point, natural: Size) -> Point {
    Point::new(pct.x / 100.0 * natural.width, pct.y / 100.0 * natural.height)
}

/// Convert natural image pixels to a 0–100 percentage position.
/// A zero-sized image maps everything to the origin.
pub fn image_to_percent(pt: Point, natural: Size) -> Point {
    if !natural.is_measurable() {
        return Point::ORIGIN;
    }
    Point::new(pt.x / natural.width * 100.0, pt.y / natural.height * 100.0)
}

/// Offset that keeps the image point under `anchor` fixed while the scale
/// changes from `old_scale` to `new_scale`.
pub fn offset_for_anchored_zoom(anchor: Point, offset: Point, old_scale: f64, new_scale: f64) -> Point {
    let ratio = new_scale / old_scale;
    Point::new(
        anchor.x - (anchor.x - offset.x) * ratio,
        anchor.y - (anchor.y - offset.y) * ratio,
    )
}

/// Offset that puts `image_pt` at `screen_pt` for the given scale.
pub fn offset_to_place(image_pt: Point, screen_pt: Point, scale: f64) -> Point {
    Point::new(screen_pt.x - image_pt.x * scale, screen_pt.y - image_pt.y * scale)
}
