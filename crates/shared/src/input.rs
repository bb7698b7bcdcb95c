//! Pointer/wheel/keyboard interpretation: the drag state machine and the
//! click-vs-drag disambiguation. Positions are container-relative
//! screen-space pixels.

use crate::models::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Auxiliary,
    Other,
}

/// Raw input delivered by the frontend.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { position: Point, button: PointerButton },
    /// `now_ms` is a monotonic timestamp used only for render throttling.
    PointerMove { position: Point, now_ms: f64 },
    PointerUp { position: Point },
    PointerLeave,
    Click { position: Point },
    Wheel { position: Point, delta_y: f64 },
    Key { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Press {
    pub origin: Point,
    /// Latched once the pointer has strayed at least the drag threshold
    /// from `origin`, even if it later comes back.
    pub dragged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle {
        /// The press that ended most recently, consumed by the next click.
        last_press: Option<Press>,
    },
    Dragging {
        press: Press,
        start_offset: Point,
        /// Most recent pointer position seen during the drag.
        pointer: Point,
    },
}

impl Default for Gesture {
    fn default() -> Self {
        Gesture::Idle { last_press: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDisposition {
    Accepted,
    /// The click closed a drag and must not reach markers or the surface.
    Suppressed,
}

impl Gesture {
    pub fn is_dragging(&self) -> bool {
        matches!(self, Gesture::Dragging { .. })
    }

    /// `Idle --pointerdown--> Dragging`. A press while already dragging
    /// (second pointer) is ignored.
    pub fn press(&mut self, origin: Point, offset: Point) {
        if self.is_dragging() {
            return;
        }
        *self = Gesture::Dragging {
            press: Press {
                origin,
                dragged: false,
            },
            start_offset: offset,
            pointer: origin,
        };
    }

    /// Re-anchor an in-progress drag after the camera moved for some other
    /// reason (wheel, keyboard, API call), so the next pointer move continues
    /// from `offset` instead of snapping back. The press origin is kept for
    /// click disambiguation.
    pub fn rebase(&mut self, offset: Point) {
        if let Gesture::Dragging {
            press,
            start_offset,
            pointer,
        } = self
        {
            *start_offset = Point::new(
                offset.x - (pointer.x - press.origin.x),
                offset.y - (pointer.y - press.origin.y),
            );
        }
    }

    /// Offset the camera should move to for a pointer at `position`, or
    /// `None` when no drag is in progress.
    pub fn drag_to(&mut self, position: Point, threshold: f64) -> Option<Point> {
        let Gesture::Dragging {
            press,
            start_offset,
            pointer,
        } = self
        else {
            return None;
        };
        *pointer = position;
        if position.distance(press.origin) >= threshold {
            press.dragged = true;
        }
        Some(Point::new(
            start_offset.x + (position.x - press.origin.x),
            start_offset.y + (position.y - press.origin.y),
        ))
    }

    /// `Dragging --pointerup|pointerleave--> Idle`. Returns whether a drag
    /// was actually in progress.
    pub fn release(&mut self, position: Option<Point>, threshold: f64) -> bool {
        let Gesture::Dragging { mut press, .. } = *self else {
            return false;
        };
        if let Some(position) = position {
            if position.distance(press.origin) >= threshold {
                press.dragged = true;
            }
        }
        *self = Gesture::Idle {
            last_press: Some(press),
        };
        true
    }

    /// Decide whether a click at `position` is a real click. Consumes the
    /// recorded press so a later synthetic click is judged on its own.
    pub fn take_click(&mut self, position: Point, threshold: f64) -> ClickDisposition {
        let press = match self {
            Gesture::Idle { last_press } => last_press.take(),
            // A click can't arrive mid-drag; treat the drag's press as the source.
            Gesture::Dragging { press, .. } => Some(*press),
        };
        match press {
            Some(press) if press.dragged || position.distance(press.origin) >= threshold => {
                ClickDisposition::Suppressed
            }
            _ => ClickDisposition::Accepted,
        }
    }
}

/// Zoom factor for a wheel event: negative delta zooms in.
pub fn wheel_zoom_factor(delta_y: f64, zoom_step: f64) -> Option<f64> {
    if !delta_y.is_finite() || delta_y == 0.0 {
        return None;
    }
    if delta_y < 0.0 {
        Some(zoom_step)
    } else {
        Some(1.0 / zoom_step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCommand {
    ZoomIn,
    ZoomOut,
    Reset,
    Pan { dx: f64, dy: f64 },
}

/// Keyboard shortcuts. Arrow keys move the view, so the image shifts the
/// opposite way.
pub fn key_command(key: &str, pan_step: f64) -> Option<KeyCommand> {
    match key {
        "+" | "=" => Some(KeyCommand::ZoomIn),
        "-" | "_" => Some(KeyCommand::ZoomOut),
        "0" | "r" | "R" => Some(KeyCommand::Reset),
        "ArrowLeft" => Some(KeyCommand::Pan { dx: pan_step, dy: 0.0 }),
        "ArrowRight" => Some(KeyCommand::Pan { dx: -pan_step, dy: 0.0 }),
        "ArrowUp" => Some(KeyCommand::Pan { dx: 0.0, dy: pan_step }),
        "ArrowDown" => Some(KeyCommand::Pan { dx: 0.0, dy: -pan_step }),
        _ => None,
    }
}
