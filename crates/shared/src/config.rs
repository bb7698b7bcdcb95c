use serde::{Deserialize, Serialize};

use crate::error::ViewportError;

pub const DEFAULT_MIN_SCALE: f64 = 0.5;
pub const DEFAULT_MAX_SCALE: f64 = 5.0;
pub const DEFAULT_ZOOM_STEP: f64 = 1.1;

/// Pointer travel (px) below which a press-release counts as a click.
pub const DEFAULT_DRAG_THRESHOLD: f64 = 5.0;

/// Screen-space radius (px) around a marker that counts as a hit.
pub const DEFAULT_HIT_RADIUS: f64 = 18.0;

/// Minimum spacing between renders while dragging (~60 fps).
pub const DEFAULT_RENDER_INTERVAL_MS: f64 = 16.0;

pub const DEFAULT_KEY_PAN_STEP: f64 = 50.0;

/// Tunables for a viewport. Every field has a default, so a partial JSON
/// object (or `{}`) deserializes into a usable config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_step: f64,
    pub drag_threshold_px: f64,
    pub hit_radius_px: f64,
    pub render_interval_ms: f64,
    pub key_pan_step_px: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            zoom_step: DEFAULT_ZOOM_STEP,
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD,
            hit_radius_px: DEFAULT_HIT_RADIUS,
            render_interval_ms: DEFAULT_RENDER_INTERVAL_MS,
            key_pan_step_px: DEFAULT_KEY_PAN_STEP,
        }
    }
}

impl ViewportConfig {
    pub fn from_json(json: &str) -> Result<Self, ViewportError> {
        let config: ViewportConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Like [`from_json`](Self::from_json) for a config embedded in a larger document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ViewportError> {
        let config: ViewportConfig = serde_json::from_value(value)?;
        Ok(config.sanitized())
    }

    /// Repair values that would break the viewport invariants instead of
    /// rejecting them: non-finite or non-positive numbers fall back to their
    /// defaults and inverted scale bounds are swapped.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let positive = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        let non_negative = |v: f64, fallback: f64| if v.is_finite() && v >= 0.0 { v } else { fallback };

        let mut min_scale = positive(self.min_scale, defaults.min_scale);
        let mut max_scale = positive(self.max_scale, defaults.max_scale);
        if min_scale > max_scale {
            tracing::warn!(min_scale, max_scale, "Swapping inverted scale bounds");
            std::mem::swap(&mut min_scale, &mut max_scale);
        }

        let zoom_step = if self.zoom_step.is_finite() && self.zoom_step > 1.0 {
            self.zoom_step
        } else {
            defaults.zoom_step
        };

        Self {
            min_scale,
            max_scale,
            zoom_step,
            drag_threshold_px: non_negative(self.drag_threshold_px, defaults.drag_threshold_px),
            hit_radius_px: non_negative(self.hit_radius_px, defaults.hit_radius_px),
            render_interval_ms: non_negative(self.render_interval_ms, defaults.render_interval_ms),
            key_pan_step_px: positive(self.key_pan_step_px, defaults.key_pan_step_px),
        }
    }

    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}
