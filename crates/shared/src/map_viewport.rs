//! The viewport controller: owns camera state, surface readiness, the
//! marker working copy, selection and gesture state, and turns public
//! operations and input events into consistent state plus a render `Frame`.

use serde_json::Value;

use crate::config::ViewportConfig;
use crate::error::ViewportError;
use crate::input::{self, ClickDisposition, Gesture, InputEvent, KeyCommand, PointerButton};
use crate::markers::{MarkerLayer, ProjectedMarker};
use crate::models::{Marker, MarkerId, Point, Size, SurfaceClick};
use crate::readiness::{ImageStatus, PendingCenterRequest, ReadinessQueue, Surface};
use crate::throttle::RenderThrottle;
use crate::transform;
use crate::viewport::ViewportState;

pub type MarkerClickHandler = Box<dyn FnMut(&Marker)>;
pub type SurfaceClickHandler = Box<dyn FnMut(SurfaceClick)>;

/// Collaborator callbacks. Both are optional.
#[derive(Default)]
pub struct ViewportHandlers {
    pub on_marker_click: Option<MarkerClickHandler>,
    pub on_surface_click: Option<SurfaceClickHandler>,
}

impl ViewportHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_marker_click(mut self, handler: impl FnMut(&Marker) + 'static) -> Self {
        self.on_marker_click = Some(Box::new(handler));
        self
    }

    pub fn on_surface_click(mut self, handler: impl FnMut(SurfaceClick) + 'static) -> Self {
        self.on_surface_click = Some(Box::new(handler));
        self
    }
}

impl std::fmt::Debug for ViewportHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportHandlers")
            .field("on_marker_click", &self.on_marker_click.is_some())
            .field("on_surface_click", &self.on_surface_click.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ViewportOptions {
    /// Identifier of the element the viewport draws into.
    pub container: String,
    pub image_path: String,
    pub markers: Vec<Marker>,
    pub config: ViewportConfig,
}

impl ViewportOptions {
    pub fn new(container: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            image_path: image_path.into(),
            markers: Vec::new(),
            config: ViewportConfig::default(),
        }
    }

    pub fn with_markers(mut self, markers: Vec<Marker>) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_config(mut self, config: ViewportConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Image still loading or container not measured yet.
    Uninitialized,
    Ready,
    Destroyed,
}

/// Requests a collaborator can send to a live viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportCommand {
    CenterOn {
        marker_id: MarkerId,
        target_zoom: Option<f64>,
    },
    Select(Option<MarkerId>),
    Zoom(f64),
    ZoomIn,
    ZoomOut,
    Reset,
    LoadImage(String),
}

/// Background image placement for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub path: Option<String>,
    pub status: ImageStatus,
    /// Scaled size on screen; zero while the size is unknown.
    pub width: f64,
    pub height: f64,
}

/// Everything the frontend needs to draw the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub revision: u64,
    pub scale: f64,
    pub offset: Point,
    pub image: ImagePlacement,
    pub markers: Vec<ProjectedMarker>,
}

impl Frame {
    /// CSS transform placing the background layer.
    pub fn css_transform(&self) -> String {
        format!(
            "transform: translate({}px, {}px) scale({}); transform-origin: 0 0;",
            self.offset.x, self.offset.y, self.scale
        )
    }
}

pub struct MapViewport {
    container: String,
    config: ViewportConfig,
    state: ViewportState,
    surface: Surface,
    layer: MarkerLayer,
    selected: Option<MarkerId>,
    gesture: Gesture,
    queue: ReadinessQueue,
    phase: Phase,
    handlers: ViewportHandlers,
    throttle: RenderThrottle,
    frame: Frame,
    dirty: bool,
}

impl std::fmt::Debug for MapViewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapViewport")
            .field("container", &self.container)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("surface", &self.surface)
            .field("markers", &self.layer.len())
            .field("selected", &self.selected)
            .field("gesture", &self.gesture)
            .field("pending", &self.queue.pending())
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl MapViewport {
    pub fn new(options: ViewportOptions, handlers: ViewportHandlers) -> Result<Self, ViewportError> {
        let container = options.container.trim().to_string();
        if container.is_empty() {
            return Err(ViewportError::MissingContainer);
        }
        let config = options.config.sanitized();
        let state = ViewportState::new(&config);
        let surface = Surface::new(options.image_path);
        let frame = Frame {
            revision: 0,
            scale: state.scale,
            offset: state.offset(),
            image: ImagePlacement {
                path: surface.image_path().map(str::to_string),
                status: surface.status(),
                width: 0.0,
                height: 0.0,
            },
            markers: Vec::new(),
        };

        tracing::debug!(
            container = %container,
            markers = options.markers.len(),
            "Creating map viewport"
        );

        let mut viewport = Self {
            container,
            config,
            state,
            surface,
            layer: MarkerLayer::new(options.markers),
            selected: None,
            gesture: Gesture::default(),
            queue: ReadinessQueue::default(),
            phase: Phase::Uninitialized,
            handlers,
            throttle: RenderThrottle::new(config.render_interval_ms),
            frame,
            dirty: false,
        };
        viewport.render();
        Ok(viewport)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == Phase::Destroyed
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_dragging()
    }

    pub fn markers(&self) -> &[Marker] {
        self.layer.markers()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn pending_center(&self) -> Option<&PendingCenterRequest> {
        self.queue.pending()
    }

    pub fn image_status(&self) -> ImageStatus {
        self.surface.status()
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn revision(&self) -> u64 {
        self.frame.revision
    }

    /// State changed since the last render (a throttled drag frame was skipped).
    pub fn needs_flush(&self) -> bool {
        self.dirty
    }

    /// Milliseconds until a skipped drag frame may be drawn.
    pub fn flush_delay(&self, now_ms: f64) -> f64 {
        self.throttle.remaining(now_ms)
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Replace the working copy of the markers wholesale.
    pub fn update_markers(&mut self, markers: Vec<Marker>) {
        if !self.alive("update_markers") {
            return;
        }
        self.layer.replace(markers);
        self.drop_stale_selection();
        self.render();
    }

    /// Like [`update_markers`](Self::update_markers) for loosely-typed input.
    pub fn update_markers_json(&mut self, value: &Value) {
        if !self.alive("update_markers_json") {
            return;
        }
        self.layer = MarkerLayer::from_value(value);
        self.drop_stale_selection();
        self.render();
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = self.selected.as_deref() {
            if self.layer.find(id).is_none() {
                tracing::debug!(marker_id = %id, "Selected marker removed, clearing selection");
                self.selected = None;
            }
        }
    }

    /// Select a marker by id, or clear the selection with `None`.
    pub fn select_marker(&mut self, id: Option<&str>) {
        if !self.alive("select_marker") {
            return;
        }
        match id {
            Some(id) if self.layer.find(id).is_none() => {
                tracing::warn!(marker_id = %id, "Cannot select unknown marker");
                return;
            }
            Some(id) => self.selected = Some(id.to_string()),
            None => self.selected = None,
        }
        self.render();
    }

    /// Center the view on a marker. Before the surface is ready the request
    /// is parked (replacing any earlier one) and replayed on readiness.
    pub fn center_on_marker(&mut self, id: &str, target_zoom: Option<f64>) {
        if !self.alive("center_on_marker") {
            return;
        }
        let request = PendingCenterRequest {
            marker_id: id.to_string(),
            target_zoom,
        };
        if !self.surface.is_ready() {
            tracing::debug!(marker_id = %id, "Viewport not ready, deferring center request");
            self.queue.defer(request);
            return;
        }
        self.apply_center(&request);
    }

    /// Zoom without an anchor: the offset is only re-clamped.
    pub fn zoom(&mut self, factor: f64) {
        if !self.alive("zoom") {
            return;
        }
        self.state.zoom(factor, None, self.surface.bounds());
        self.gesture.rebase(self.state.offset());
        self.render();
    }

    /// Zoom keeping the image point under `anchor` (screen-space) fixed.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        if !self.alive("zoom_at") {
            return;
        }
        self.state.zoom(factor, Some(anchor), self.surface.bounds());
        self.gesture.rebase(self.state.offset());
        self.render();
    }

    pub fn zoom_in(&mut self) {
        self.zoom_step(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_step(1.0 / self.config.zoom_step);
    }

    fn zoom_step(&mut self, factor: f64) {
        let container = self.surface.container();
        if container.is_measurable() {
            self.zoom_at(factor, container.center());
        } else {
            self.zoom(factor);
        }
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        if !self.alive("pan") {
            return;
        }
        self.state.pan(dx, dy, self.surface.bounds());
        self.gesture.rebase(self.state.offset());
        self.render();
    }

    /// Back to scale 1 at the origin. Selection is left alone.
    pub fn reset_view(&mut self) {
        if !self.alive("reset_view") {
            return;
        }
        self.state.reset();
        self.gesture.rebase(self.state.offset());
        self.render();
    }

    /// Swap the background image. The view resets and notifications for
    /// the previous image are ignored from now on.
    pub fn load_image(&mut self, path: &str) {
        if !self.alive("load_image") {
            return;
        }
        if !self.surface.replace_image(path) {
            return;
        }
        tracing::debug!(path = %path, "Loading new background image");
        self.state.reset();
        self.gesture = Gesture::default();
        self.sync_readiness();
        self.render();
    }

    pub fn apply(&mut self, command: ViewportCommand) {
        match command {
            ViewportCommand::CenterOn {
                marker_id,
                target_zoom,
            } => self.center_on_marker(&marker_id, target_zoom),
            ViewportCommand::Select(id) => self.select_marker(id.as_deref()),
            ViewportCommand::Zoom(factor) => self.zoom(factor),
            ViewportCommand::ZoomIn => self.zoom_in(),
            ViewportCommand::ZoomOut => self.zoom_out(),
            ViewportCommand::Reset => self.reset_view(),
            ViewportCommand::LoadImage(path) => self.load_image(&path),
        }
    }

    /// Tear down: drop the handlers and the image reference. Every later
    /// call is a no-op, so nothing fires after this returns.
    pub fn destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        tracing::debug!(container = %self.container, "Destroying map viewport");
        self.phase = Phase::Destroyed;
        self.handlers = ViewportHandlers::default();
        self.surface.release();
        self.queue.clear();
        self.gesture = Gesture::default();
        self.layer = MarkerLayer::default();
        self.selected = None;
        self.dirty = false;
    }

    // -----------------------------------------------------------------------
    // External notifications
    // -----------------------------------------------------------------------

    /// The background image at `path` finished loading.
    pub fn image_loaded(&mut self, path: &str, natural: Size) {
        if !self.alive("image_loaded") {
            return;
        }
        if !self.surface.is_current(path) {
            tracing::debug!(path = %path, "Ignoring load event for stale image");
            return;
        }
        if natural.is_measurable() {
            tracing::debug!(width = natural.width, height = natural.height, "Background image loaded");
            self.surface.set_status(ImageStatus::Loaded { natural });
        } else {
            tracing::warn!(path = %path, "Background image reported no size, using plain background");
            self.surface.set_status(ImageStatus::Failed);
        }
        self.settle();
    }

    /// The background image at `path` failed to load. Interaction keeps
    /// working over a plain background.
    pub fn image_failed(&mut self, path: &str) {
        if !self.alive("image_failed") {
            return;
        }
        if !self.surface.is_current(path) {
            tracing::debug!(path = %path, "Ignoring error event for stale image");
            return;
        }
        tracing::warn!(path = %path, "Background image failed to load, using plain background");
        self.surface.set_status(ImageStatus::Failed);
        self.settle();
    }

    /// The container (or an ancestor affecting it) changed size.
    pub fn container_resized(&mut self, size: Size) {
        if !self.alive("container_resized") {
            return;
        }
        let size = if size.width.is_finite() && size.height.is_finite() {
            Size::new(size.width.max(0.0), size.height.max(0.0))
        } else {
            Size::ZERO
        };
        self.surface.set_container(size);
        self.settle();
    }

    fn settle(&mut self) {
        self.state.clamp_bounds(self.surface.bounds());
        self.gesture.rebase(self.state.offset());
        self.sync_readiness();
        self.render();
    }

    /// The single consumption point of the pending center request.
    fn sync_readiness(&mut self) {
        let ready = self.surface.is_ready();
        self.phase = if ready { Phase::Ready } else { Phase::Uninitialized };
        if let Some(request) = self.queue.take_if_ready(ready) {
            tracing::debug!(marker_id = %request.marker_id, "Replaying deferred center request");
            self.apply_center(&request);
        }
    }

    fn apply_center(&mut self, request: &PendingCenterRequest) {
        let Some(bounds) = self.surface.bounds() else {
            return;
        };
        let Some(marker) = self.layer.find(&request.marker_id) else {
            tracing::warn!(marker_id = %request.marker_id, "Cannot center on unknown marker");
            return;
        };
        let target = MarkerLayer::image_position(marker, bounds.image);
        self.state.center_on(target, request.target_zoom, bounds);
        self.gesture.rebase(self.state.offset());
        self.render();
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Feed one input event. Returns `true` when the event was consumed and
    /// the browser default (scrolling, text selection) should be prevented.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        if !self.alive("handle_input") {
            return false;
        }
        let threshold = self.config.drag_threshold_px;
        match event {
            InputEvent::PointerDown { position, button } => {
                if button != PointerButton::Primary {
                    return false;
                }
                self.gesture.press(position, self.state.offset());
                true
            }
            InputEvent::PointerMove { position, now_ms } => {
                let Some(offset) = self.gesture.drag_to(position, threshold) else {
                    return false;
                };
                self.state.pan_to(offset, self.surface.bounds());
                self.dirty = true;
                if self.throttle.admit(now_ms) {
                    self.render();
                }
                true
            }
            InputEvent::PointerUp { position } => {
                if self.gesture.release(Some(position), threshold) {
                    // The last frame of a drag always reflects the final offset.
                    self.render();
                    self.throttle.reset();
                }
                true
            }
            InputEvent::PointerLeave => {
                if self.gesture.release(None, threshold) {
                    self.render();
                    self.throttle.reset();
                }
                false
            }
            InputEvent::Click { position } => match self.gesture.take_click(position, threshold) {
                ClickDisposition::Suppressed => {
                    tracing::trace!("Click suppressed after drag");
                    true
                }
                ClickDisposition::Accepted => {
                    self.dispatch_click(position);
                    true
                }
            },
            InputEvent::Wheel { position, delta_y } => {
                if let Some(factor) = input::wheel_zoom_factor(delta_y, self.config.zoom_step) {
                    self.zoom_at(factor, position);
                }
                true
            }
            InputEvent::Key { key } => {
                let Some(command) = input::key_command(&key, self.config.key_pan_step_px) else {
                    return false;
                };
                match command {
                    KeyCommand::ZoomIn => self.zoom_in(),
                    KeyCommand::ZoomOut => self.zoom_out(),
                    KeyCommand::Reset => self.reset_view(),
                    KeyCommand::Pan { dx, dy } => self.pan(dx, dy),
                }
                true
            }
        }
    }

    fn dispatch_click(&mut self, position: Point) {
        let Some(natural) = self.surface.image_size() else {
            tracing::debug!("Ignoring click before the surface has a size");
            return;
        };
        let hit = self
            .layer
            .hit_test(&self.state, natural, position, self.config.hit_radius_px);
        match hit {
            Some(index) => {
                let marker = self.layer.markers()[index].clone();
                self.selected = Some(marker.id.clone());
                self.render();
                if let Some(handler) = self.handlers.on_marker_click.as_mut() {
                    handler(&marker);
                }
            }
            None => {
                let image = transform::screen_to_image(position, &self.state);
                let click = SurfaceClick {
                    image,
                    percent: transform::image_to_percent(image, natural),
                };
                if let Some(handler) = self.handlers.on_surface_click.as_mut() {
                    handler(click);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Draw a frame that was skipped by the drag throttle.
    pub fn flush(&mut self) {
        if self.dirty && !self.is_destroyed() {
            self.render();
        }
    }

    fn render(&mut self) {
        let size = self.surface.image_size();
        let markers = size
            .map(|natural| {
                self.layer
                    .project(&self.state, natural, self.selected.as_deref())
            })
            .unwrap_or_default();
        let (width, height) = size
            .map(|s| (s.width * self.state.scale, s.height * self.state.scale))
            .unwrap_or((0.0, 0.0));

        self.frame = Frame {
            revision: self.frame.revision + 1,
            scale: self.state.scale,
            offset: self.state.offset(),
            image: ImagePlacement {
                path: self.surface.image_path().map(str::to_string),
                status: self.surface.status(),
                width,
                height,
            },
            markers,
        };
        self.dirty = false;
    }

    fn alive(&self, operation: &'static str) -> bool {
        if self.is_destroyed() {
            tracing::debug!(operation, "Ignoring call on destroyed viewport");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarkerKind;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    const IMAGE: &str = "/static/maps/realm.webp";
    const NATURAL: Size = Size {
        width: 2000.0,
        height: 1500.0,
    };
    const CONTAINER: Size = Size {
        width: 800.0,
        height: 600.0,
    };

    fn marker(id: &str, x: f64, y: f64) -> Marker {
        Marker {
            id: id.to_string(),
            name: format!("Place {id}"),
            kind: MarkerKind::City,
            x,
            y,
            discovered: true,
        }
    }

    fn markers() -> Vec<Marker> {
        vec![marker("keep", 50.0, 50.0), marker("ford", 40.0, 60.0)]
    }

    #[derive(Default)]
    struct Recorded {
        marker_clicks: Vec<String>,
        surface_clicks: Vec<SurfaceClick>,
    }

    fn viewport_with_log() -> (MapViewport, Rc<RefCell<Recorded>>) {
        let log = Rc::new(RefCell::new(Recorded::default()));
        let marker_log = log.clone();
        let surface_log = log.clone();
        let handlers = ViewportHandlers::new()
            .on_marker_click(move |m| marker_log.borrow_mut().marker_clicks.push(m.id.clone()))
            .on_surface_click(move |c| surface_log.borrow_mut().surface_clicks.push(c));
        let options = ViewportOptions::new("atlas-map", IMAGE).with_markers(markers());
        (MapViewport::new(options, handlers).unwrap(), log)
    }

    fn ready_viewport() -> (MapViewport, Rc<RefCell<Recorded>>) {
        let (mut vp, log) = viewport_with_log();
        vp.container_resized(CONTAINER);
        vp.image_loaded(IMAGE, NATURAL);
        (vp, log)
    }

    fn screen_of(vp: &MapViewport, id: &str) -> Point {
        vp.frame()
            .markers
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.screen)
            .unwrap()
    }

    fn press(vp: &mut MapViewport, x: f64, y: f64) {
        vp.handle_input(InputEvent::PointerDown {
            position: Point::new(x, y),
            button: PointerButton::Primary,
        });
    }

    // --- construction ---

    #[test]
    fn test_new_rejects_missing_container() {
        let options = ViewportOptions::new("  ", IMAGE);
        let err = MapViewport::new(options, ViewportHandlers::default()).unwrap_err();
        assert!(matches!(err, ViewportError::MissingContainer));
    }

    #[test]
    fn test_new_starts_uninitialized_with_defaults() {
        let (vp, _) = viewport_with_log();
        assert_eq!(vp.phase(), Phase::Uninitialized);
        assert!((vp.state().scale - 1.0).abs() < 1e-9);
        assert_eq!(vp.state().offset(), Point::ORIGIN);
        assert_eq!(vp.image_status(), ImageStatus::Loading);
        assert!(vp.frame().markers.is_empty(), "nothing projected before the image size is known");
    }

    #[test]
    fn test_ready_after_image_and_container() {
        let (vp, _) = ready_viewport();
        assert_eq!(vp.phase(), Phase::Ready);
        assert_eq!(vp.frame().markers.len(), 2);
        assert!((vp.frame().image.width - 2000.0).abs() < 1e-9);
    }

    // --- transform operations ---

    #[test]
    fn test_zoom_sequence_stays_in_bounds() {
        let (mut vp, _) = ready_viewport();
        for factor in [3.0, 3.0, 3.0, 0.1, 0.1, 0.1, 0.1, 7.5] {
            vp.zoom(factor);
            let s = vp.state();
            assert!(s.scale >= s.min_scale && s.scale <= s.max_scale);
        }
    }

    #[test]
    fn test_zoom_one_keeps_state() {
        let (mut vp, _) = ready_viewport();
        vp.pan(-120.0, -80.0);
        let before = *vp.state();
        vp.zoom(1.0);
        assert_eq!(*vp.state(), before);
    }

    #[test]
    fn test_reset_view_after_changes() {
        let (mut vp, _) = ready_viewport();
        vp.zoom_at(2.5, Point::new(300.0, 200.0));
        vp.pan(-400.0, -100.0);
        vp.select_marker(Some("ford"));
        vp.reset_view();
        assert!((vp.state().scale - 1.0).abs() < 1e-9);
        assert_eq!(vp.state().offset(), Point::ORIGIN);
        assert_eq!(vp.selected(), Some("ford"), "reset does not touch selection");
    }

    #[test]
    fn test_zoom_in_out_anchor_on_container_center() {
        let (mut vp, _) = ready_viewport();
        vp.pan(-600.0, -450.0);
        let center = CONTAINER.center();
        let before = transform::screen_to_image(center, vp.state());
        vp.zoom_in();
        let after = transform::screen_to_image(center, vp.state());
        assert!((before.x - after.x).abs() < 1e-6);
        assert!((before.y - after.y).abs() < 1e-6);
        assert!(vp.state().scale > 1.0);
        vp.zoom_out();
        assert!((vp.state().scale - 1.0).abs() < 1e-9);
    }

    // --- centering and readiness ---

    #[test]
    fn test_center_on_marker_when_ready() {
        let (mut vp, _) = ready_viewport();
        vp.center_on_marker("ford", Some(2.0));
        let p = screen_of(&vp, "ford");
        assert!((p.x - 400.0).abs() < 1.0);
        assert!((p.y - 300.0).abs() < 1.0);
        assert!((vp.state().scale - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_center_on_unknown_marker_is_noop() {
        let (mut vp, _) = ready_viewport();
        vp.pan(-50.0, -50.0);
        let before = *vp.state();
        vp.center_on_marker("nowhere", Some(3.0));
        assert_eq!(*vp.state(), before);
    }

    #[test]
    fn test_center_before_ready_is_deferred_then_replayed_once() {
        let (mut vp, _) = viewport_with_log();
        let before = *vp.state();

        vp.center_on_marker("keep", Some(2.0));
        assert_eq!(*vp.state(), before, "no mutation before readiness");
        assert!(vp.pending_center().is_some());

        vp.container_resized(CONTAINER);
        assert_eq!(*vp.state(), before, "image still loading");

        vp.image_loaded(IMAGE, NATURAL);
        let p = screen_of(&vp, "keep");
        assert!((p.x - 400.0).abs() < 1.0);
        assert!((p.y - 300.0).abs() < 1.0);
        assert!(vp.pending_center().is_none());

        // Move away, then signal readiness again: no re-centering
        vp.pan(-200.0, -100.0);
        let moved = *vp.state();
        vp.container_resized(CONTAINER);
        assert_eq!(*vp.state(), moved);
    }

    #[test]
    fn test_deferred_request_last_write_wins() {
        let (mut vp, _) = viewport_with_log();
        vp.center_on_marker("keep", None);
        vp.center_on_marker("ford", Some(2.0));
        vp.image_loaded(IMAGE, NATURAL);
        vp.container_resized(CONTAINER);
        let p = screen_of(&vp, "ford");
        assert!((p.x - 400.0).abs() < 1.0);
        assert!((p.y - 300.0).abs() < 1.0);
    }

    #[test]
    fn test_collapsed_container_defers_again() {
        let (mut vp, _) = ready_viewport();
        vp.container_resized(Size::ZERO);
        assert_eq!(vp.phase(), Phase::Uninitialized);
        vp.center_on_marker("ford", Some(2.0));
        assert!(vp.pending_center().is_some());
        vp.container_resized(CONTAINER);
        assert_eq!(vp.phase(), Phase::Ready);
        let p = screen_of(&vp, "ford");
        assert!((p.x - 400.0).abs() < 1.0);
        assert!((p.y - 300.0).abs() < 1.0);
    }

    #[test]
    fn test_deferred_unknown_marker_replays_as_noop() {
        let (mut vp, _) = viewport_with_log();
        vp.center_on_marker("ghost", Some(2.0));
        vp.container_resized(CONTAINER);
        vp.image_loaded(IMAGE, NATURAL);
        assert!((vp.state().scale - 1.0).abs() < 1e-9);
        assert!(vp.pending_center().is_none());
    }

    #[test]
    fn test_resize_reclamps_offset() {
        let (mut vp, _) = ready_viewport();
        vp.pan(-1200.0, -900.0);
        vp.container_resized(Size::new(1600.0, 1200.0));
        // Image 2000x1500 in a 1600x1200 container: offset >= -400, -300
        assert!((vp.state().offset_x + 400.0).abs() < 1e-9);
        assert!((vp.state().offset_y + 300.0).abs() < 1e-9);
    }

    // --- image lifecycle ---

    #[test]
    fn test_failed_image_keeps_interaction() {
        let (mut vp, log) = viewport_with_log();
        vp.container_resized(CONTAINER);
        vp.image_failed(IMAGE);
        assert_eq!(vp.phase(), Phase::Ready);
        assert_eq!(vp.frame().image.status, ImageStatus::Failed);

        // Plain background is container sized: "keep" at 50% sits at the center
        let p = screen_of(&vp, "keep");
        assert!((p.x - 400.0).abs() < 1e-9);
        vp.handle_input(InputEvent::Click { position: p });
        assert_eq!(log.borrow().marker_clicks, vec!["keep".to_string()]);
    }

    #[test]
    fn test_failure_reported_at_mount_replays_deferred_center() {
        let (mut vp, _) = viewport_with_log();
        vp.center_on_marker("keep", Some(2.0));
        vp.container_resized(CONTAINER);
        vp.image_failed(IMAGE);
        assert_eq!(vp.phase(), Phase::Ready);
        assert_eq!(vp.image_status(), ImageStatus::Failed);
        assert!(vp.pending_center().is_none());
        assert!((vp.state().scale - 2.0).abs() < 1e-9);
        let p = screen_of(&vp, "keep");
        assert!((p.x - 400.0).abs() < 1.0);
        assert!((p.y - 300.0).abs() < 1.0);
    }

    #[test]
    fn test_zero_size_load_is_treated_as_failure() {
        let (mut vp, _) = viewport_with_log();
        vp.image_loaded(IMAGE, Size::ZERO);
        assert_eq!(vp.image_status(), ImageStatus::Failed);
    }

    #[test]
    fn test_stale_image_events_are_ignored() {
        let (mut vp, _) = viewport_with_log();
        vp.container_resized(CONTAINER);
        vp.load_image("/static/maps/underdark.webp");
        vp.image_loaded(IMAGE, NATURAL);
        assert_eq!(vp.image_status(), ImageStatus::Loading);
        assert_eq!(vp.phase(), Phase::Uninitialized);

        vp.image_loaded("/static/maps/underdark.webp", Size::new(1000.0, 1000.0));
        assert_eq!(vp.phase(), Phase::Ready);
    }

    #[test]
    fn test_load_image_resets_view() {
        let (mut vp, _) = ready_viewport();
        vp.zoom_at(2.0, Point::new(100.0, 100.0));
        vp.load_image("/static/maps/coast.webp");
        assert!((vp.state().scale - 1.0).abs() < 1e-9);
        assert_eq!(vp.state().offset(), Point::ORIGIN);
        assert_eq!(vp.frame().image.path.as_deref(), Some("/static/maps/coast.webp"));
    }

    // --- markers and selection ---

    #[test]
    fn test_update_markers_replaces_wholesale() {
        let (mut vp, _) = ready_viewport();
        vp.update_markers(vec![marker("camp", 10.0, 10.0)]);
        assert_eq!(vp.markers().len(), 1);
        assert_eq!(vp.frame().markers[0].id, "camp");
    }

    #[test]
    fn test_update_markers_clears_selection_of_removed_marker() {
        let (mut vp, _) = ready_viewport();
        vp.select_marker(Some("keep"));
        vp.update_markers(vec![marker("keep", 50.0, 50.0), marker("camp", 10.0, 10.0)]);
        assert_eq!(vp.selected(), Some("keep"));

        vp.update_markers(vec![marker("camp", 10.0, 10.0)]);
        assert_eq!(vp.selected(), None);
        assert!(vp.frame().markers.iter().all(|m| !m.selected));

        vp.select_marker(Some("camp"));
        vp.update_markers_json(&json!([]));
        assert_eq!(vp.selected(), None);
    }

    #[test]
    fn test_update_markers_json_non_array_is_empty() {
        let (mut vp, _) = ready_viewport();
        vp.update_markers_json(&json!({"markers": []}));
        assert!(vp.markers().is_empty());
        assert!(vp.frame().markers.is_empty());
    }

    #[test]
    fn test_select_marker_emphasis() {
        let (mut vp, _) = ready_viewport();
        vp.select_marker(Some("ford"));
        let selected: Vec<_> = vp.frame().markers.iter().filter(|m| m.show_label).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "ford");

        vp.select_marker(Some("unknown"));
        assert_eq!(vp.selected(), Some("ford"));

        vp.select_marker(None);
        assert_eq!(vp.selected(), None);
    }

    // --- input ---

    #[test]
    fn test_click_on_marker_selects_and_notifies() {
        let (mut vp, log) = ready_viewport();
        let p = screen_of(&vp, "keep");
        press(&mut vp, p.x + 3.0, p.y);
        vp.handle_input(InputEvent::PointerUp {
            position: Point::new(p.x + 3.0, p.y),
        });
        vp.handle_input(InputEvent::Click {
            position: Point::new(p.x + 3.0, p.y),
        });
        assert_eq!(log.borrow().marker_clicks, vec!["keep".to_string()]);
        assert!(log.borrow().surface_clicks.is_empty());
        assert_eq!(vp.selected(), Some("keep"));
    }

    #[test]
    fn test_click_on_empty_surface_reports_image_point() {
        let (mut vp, log) = ready_viewport();
        vp.zoom_at(2.0, Point::ORIGIN);
        vp.pan(-100.0, -60.0);
        let click = Point::new(50.0, 40.0);
        vp.handle_input(InputEvent::Click { position: click });

        let recorded = log.borrow();
        assert!(recorded.marker_clicks.is_empty());
        let surface = recorded.surface_clicks[0];
        let expected = transform::screen_to_image(click, vp.state());
        assert!((surface.image.x - expected.x).abs() < 1e-9);
        assert!((surface.image.y - expected.y).abs() < 1e-9);
        assert!((surface.percent.x - expected.x / 2000.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_pans_and_suppresses_click() {
        let (mut vp, log) = ready_viewport();
        press(&mut vp, 400.0, 300.0);
        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(350.0, 280.0),
            now_ms: 0.0,
        });
        vp.handle_input(InputEvent::PointerUp {
            position: Point::new(350.0, 280.0),
        });
        vp.handle_input(InputEvent::Click {
            position: Point::new(350.0, 280.0),
        });
        assert!((vp.state().offset_x + 50.0).abs() < 1e-9);
        assert!((vp.state().offset_y + 20.0).abs() < 1e-9);
        assert!(log.borrow().surface_clicks.is_empty());
        assert!(log.borrow().marker_clicks.is_empty());
    }

    #[test]
    fn test_small_jitter_still_clicks() {
        let (mut vp, log) = ready_viewport();
        press(&mut vp, 100.0, 100.0);
        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(102.0, 101.0),
            now_ms: 0.0,
        });
        vp.handle_input(InputEvent::PointerUp {
            position: Point::new(102.0, 101.0),
        });
        vp.handle_input(InputEvent::Click {
            position: Point::new(102.0, 101.0),
        });
        assert_eq!(log.borrow().surface_clicks.len(), 1);
    }

    #[test]
    fn test_secondary_button_does_not_drag() {
        let (mut vp, _) = ready_viewport();
        let consumed = vp.handle_input(InputEvent::PointerDown {
            position: Point::new(10.0, 10.0),
            button: PointerButton::Secondary,
        });
        assert!(!consumed);
        assert!(!vp.is_dragging());
    }

    #[test]
    fn test_drag_render_is_throttled_but_state_is_not() {
        let (mut vp, _) = ready_viewport();
        press(&mut vp, 400.0, 300.0);

        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(390.0, 300.0),
            now_ms: 1000.0,
        });
        let rendered = vp.revision();
        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(380.0, 300.0),
            now_ms: 1005.0,
        });
        assert_eq!(vp.revision(), rendered, "second move inside 16ms is not rendered");
        assert!((vp.state().offset_x + 20.0).abs() < 1e-9, "state still updated");
        assert!(vp.needs_flush());
        assert!((vp.flush_delay(1005.0) - 11.0).abs() < 1e-9);

        vp.handle_input(InputEvent::PointerUp {
            position: Point::new(370.0, 300.0),
        });
        assert!(!vp.needs_flush());
        assert!((vp.frame().offset.x - vp.state().offset_x).abs() < 1e-9);
    }

    #[test]
    fn test_flush_draws_skipped_frame() {
        let (mut vp, _) = ready_viewport();
        press(&mut vp, 400.0, 300.0);
        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(390.0, 300.0),
            now_ms: 1000.0,
        });
        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(360.0, 300.0),
            now_ms: 1001.0,
        });
        vp.flush();
        assert!((vp.frame().offset.x + 40.0).abs() < 1e-9);
        assert!(!vp.needs_flush());
    }

    #[test]
    fn test_pointer_leave_ends_drag() {
        let (mut vp, _) = ready_viewport();
        press(&mut vp, 400.0, 300.0);
        assert!(vp.is_dragging());
        vp.handle_input(InputEvent::PointerLeave);
        assert!(!vp.is_dragging());
        let consumed = vp.handle_input(InputEvent::PointerMove {
            position: Point::new(100.0, 100.0),
            now_ms: 0.0,
        });
        assert!(!consumed);
        assert_eq!(vp.state().offset(), Point::ORIGIN);
    }

    #[test]
    fn test_wheel_zooms_at_cursor() {
        let (mut vp, _) = ready_viewport();
        let cursor = Point::new(250.0, 180.0);
        let before = transform::screen_to_image(cursor, vp.state());
        assert!(vp.handle_input(InputEvent::Wheel {
            position: cursor,
            delta_y: -100.0,
        }));
        let after = transform::screen_to_image(cursor, vp.state());
        assert!((vp.state().scale - 1.1).abs() < 1e-9);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_wheel_during_drag_keeps_point_under_cursor() {
        let (mut vp, _) = ready_viewport();
        let cursor = Point::new(400.0, 300.0);
        press(&mut vp, cursor.x, cursor.y);
        vp.handle_input(InputEvent::PointerMove {
            position: cursor,
            now_ms: 0.0,
        });
        vp.handle_input(InputEvent::Wheel {
            position: cursor,
            delta_y: -100.0,
        });
        let under_cursor = transform::screen_to_image(cursor, vp.state());

        // Pointer hasn't moved: the zoomed view must stay put
        vp.handle_input(InputEvent::PointerMove {
            position: cursor,
            now_ms: 100.0,
        });
        let still = transform::screen_to_image(cursor, vp.state());
        assert!((vp.state().scale - 1.1).abs() < 1e-9);
        assert!((still.x - under_cursor.x).abs() < 1e-9);
        assert!((still.y - under_cursor.y).abs() < 1e-9);

        // Further movement continues from the zoomed offset
        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(410.0, 300.0),
            now_ms: 200.0,
        });
        assert!((vp.state().offset_x + 30.0).abs() < 1e-9);
        assert!((vp.state().offset_y + 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_key_pan_during_drag_is_not_undone() {
        let (mut vp, _) = ready_viewport();
        press(&mut vp, 400.0, 300.0);
        vp.handle_input(InputEvent::Key {
            key: "ArrowRight".into(),
        });
        vp.handle_input(InputEvent::PointerMove {
            position: Point::new(400.0, 300.0),
            now_ms: 0.0,
        });
        assert!((vp.state().offset_x + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_keyboard_shortcuts() {
        let (mut vp, _) = ready_viewport();
        assert!(vp.handle_input(InputEvent::Key { key: "+".into() }));
        assert!(vp.state().scale > 1.0);
        assert!(vp.handle_input(InputEvent::Key { key: "r".into() }));
        assert!((vp.state().scale - 1.0).abs() < 1e-9);
        assert!(vp.handle_input(InputEvent::Key {
            key: "ArrowRight".into()
        }));
        assert!((vp.state().offset_x + 50.0).abs() < 1e-9);
        assert!(!vp.handle_input(InputEvent::Key { key: "x".into() }));
    }

    // --- commands and teardown ---

    #[test]
    fn test_apply_commands() {
        let (mut vp, _) = ready_viewport();
        vp.apply(ViewportCommand::Zoom(2.0));
        assert!((vp.state().scale - 2.0).abs() < 1e-9);
        vp.apply(ViewportCommand::Select(Some("keep".into())));
        assert_eq!(vp.selected(), Some("keep"));
        vp.apply(ViewportCommand::CenterOn {
            marker_id: "ford".into(),
            target_zoom: None,
        });
        let p = screen_of(&vp, "ford");
        assert!((p.x - 400.0).abs() < 1.0);
        vp.apply(ViewportCommand::Reset);
        assert_eq!(vp.state().offset(), Point::ORIGIN);
    }

    #[test]
    fn test_destroy_silences_everything() {
        let (mut vp, log) = ready_viewport();
        vp.center_on_marker("keep", None);
        vp.destroy();
        assert!(vp.is_destroyed());
        assert!(vp.pending_center().is_none());
        assert_eq!(vp.frame().image.path.as_deref(), Some(IMAGE), "last frame stays as drawn");

        let revision = vp.revision();
        vp.image_loaded(IMAGE, NATURAL);
        vp.container_resized(CONTAINER);
        vp.zoom(2.0);
        assert!(!vp.handle_input(InputEvent::Click {
            position: Point::new(400.0, 300.0),
        }));
        assert_eq!(vp.revision(), revision);
        assert!(log.borrow().marker_clicks.is_empty());
        assert!(log.borrow().surface_clicks.is_empty());
        assert_eq!(vp.phase(), Phase::Destroyed);
    }

    #[test]
    fn test_css_transform() {
        let (mut vp, _) = ready_viewport();
        vp.zoom_at(2.0, Point::ORIGIN);
        vp.pan(-10.0, -20.0);
        assert_eq!(
            vp.frame().css_transform(),
            "transform: translate(-10px, -20px) scale(2); transform-origin: 0 0;"
        );
    }
}
