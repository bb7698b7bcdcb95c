use crate::config::ViewportConfig;
use crate::models::{Point, Size};
use crate::transform;

/// Image and container dimensions used for offset clamping. Only built when
/// both are known, so clamping is skipped while the image is still loading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub image: Size,
    pub container: Size,
}

/// Camera over the background image. Mutated only through the transform
/// operations below; each one leaves `min_scale <= scale <= max_scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

impl ViewportState {
    pub fn new(config: &ViewportConfig) -> Self {
        let config = config.sanitized();
        Self {
            scale: config.clamp_scale(1.0),
            offset_x: 0.0,
            offset_y: 0.0,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
        }
    }

    pub fn offset(&self) -> Point {
        Point::new(self.offset_x, self.offset_y)
    }

    fn set_offset(&mut self, offset: Point) {
        self.offset_x = offset.x;
        self.offset_y = offset.y;
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Multiply the scale by `factor`, optionally keeping the image point
    /// under `anchor` (screen-space) fixed.
    pub fn zoom(&mut self, factor: f64, anchor: Option<Point>, bounds: Option<Bounds>) {
        if !factor.is_finite() || factor <= 0.0 {
            tracing::debug!(factor, "Ignoring invalid zoom factor");
            return;
        }
        let old_scale = self.scale;
        let new_scale = self.clamp_scale(old_scale * factor);
        if let Some(anchor) = anchor {
            let offset = transform::offset_for_anchored_zoom(anchor, self.offset(), old_scale, new_scale);
            self.set_offset(offset);
        }
        self.scale = new_scale;
        self.clamp_bounds(bounds);
    }

    pub fn pan(&mut self, dx: f64, dy: f64, bounds: Option<Bounds>) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.offset_x += dx;
        self.offset_y += dy;
        self.clamp_bounds(bounds);
    }

    /// Move to an absolute offset (drag updates are computed from the offset
    /// captured at drag start, not accumulated).
    pub fn pan_to(&mut self, offset: Point, bounds: Option<Bounds>) {
        self.set_offset(offset);
        self.clamp_bounds(bounds);
    }

    pub fn reset(&mut self) {
        self.scale = self.clamp_scale(1.0);
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    /// Put `image_pt` (natural pixels) at the container center, optionally
    /// switching to `target_zoom` first.
    pub fn center_on(&mut self, image_pt: Point, target_zoom: Option<f64>, bounds: Bounds) {
        if let Some(zoom) = target_zoom.filter(|z| z.is_finite() && *z > 0.0) {
            self.scale = self.clamp_scale(zoom);
        }
        let offset = transform::offset_to_place(image_pt, bounds.container.center(), self.scale);
        self.set_offset(offset);
        self.clamp_bounds(Some(bounds));
    }

    /// Keep the scaled image from exposing empty space when it is larger
    /// than the container. On an axis where it is smaller, the image may sit
    /// anywhere fully inside the container.
    pub fn clamp_bounds(&mut self, bounds: Option<Bounds>) {
        let Some(bounds) = bounds else { return };
        if !bounds.image.is_measurable() || !bounds.container.is_measurable() {
            return;
        }
        self.offset_x = clamp_axis(
            self.offset_x,
            bounds.image.width * self.scale,
            bounds.container.width,
        );
        self.offset_y = clamp_axis(
            self.offset_y,
            bounds.image.height * self.scale,
            bounds.container.height,
        );
    }
}

fn clamp_axis(offset: f64, scaled_len: f64, container_len: f64) -> f64 {
    if scaled_len >= container_len {
        offset.clamp(container_len - scaled_len, 0.0)
    } else {
        offset.clamp(0.0, container_len - scaled_len)
    }
}
