use std::cell::{Cell, RefCell};
use std::rc::Rc;

use atlas_shared::input::{InputEvent, PointerButton};
use atlas_shared::map_viewport::{
    Frame, MapViewport, ViewportCommand, ViewportHandlers, ViewportOptions,
};
use atlas_shared::models::{Marker, Size, SurfaceClick};
use atlas_shared::readiness::ImageStatus;
use atlas_shared::ViewportConfig;
use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;

use crate::components::marker_layer::MarkerLayer;
use crate::components::viewport_controls::ViewportControls;
use crate::coords;
use crate::dom::{self, ImageState, ResizeWatcher};

fn pointer_button(button: Option<MouseButton>) -> PointerButton {
    match button {
        Some(MouseButton::Primary) => PointerButton::Primary,
        Some(MouseButton::Secondary) => PointerButton::Secondary,
        Some(MouseButton::Auxiliary) => PointerButton::Auxiliary,
        _ => PointerButton::Other,
    }
}

// ---------------------------------------------------------------------------
// Controller plumbing
// ---------------------------------------------------------------------------

/// Everything the event handlers share: the controller slot, the resize
/// watcher, and the signals the render reads.
#[derive(Clone)]
struct MapContext {
    viewport: Rc<RefCell<Option<MapViewport>>>,
    watcher: Rc<RefCell<Option<ResizeWatcher>>>,
    flush_scheduled: Rc<Cell<bool>>,
    frame: Signal<Option<Frame>>,
    dragging: Signal<bool>,
}

impl MapContext {
    fn new(frame: Signal<Option<Frame>>, dragging: Signal<bool>) -> Self {
        Self {
            viewport: Rc::new(RefCell::new(None)),
            watcher: Rc::new(RefCell::new(None)),
            flush_scheduled: Rc::new(Cell::new(false)),
            frame,
            dragging,
        }
    }

    fn is_installed(&self) -> bool {
        self.viewport
            .try_borrow()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn install(&self, viewport: MapViewport) {
        match self.viewport.try_borrow_mut() {
            Ok(mut slot) => *slot = Some(viewport),
            Err(_) => tracing::warn!("Viewport busy, could not install controller"),
        }
    }

    /// Run `f` against the controller and publish a new frame if it rendered.
    /// Returns `None` before mount, or when called from inside a handler.
    fn run<R>(&self, f: impl FnOnce(&mut MapViewport) -> R) -> Option<R> {
        let shown = self.frame.peek().as_ref().map(|f| f.revision);
        let (result, next) = {
            let Ok(mut slot) = self.viewport.try_borrow_mut() else {
                tracing::warn!("Viewport busy, dropping re-entrant call");
                return None;
            };
            let viewport = slot.as_mut()?;
            let result = f(viewport);
            let next = (Some(viewport.revision()) != shown).then(|| viewport.frame().clone());
            (result, next)
        };
        if next.is_some() {
            let mut frame = self.frame;
            frame.set(next);
        }
        Some(result)
    }

    /// Feed an input event; returns whether the browser default should be
    /// prevented.
    fn feed(&self, event: InputEvent) -> bool {
        let Some((consumed, is_dragging)) =
            self.run(|vp| (vp.handle_input(event), vp.is_dragging()))
        else {
            return false;
        };
        if *self.dragging.peek() != is_dragging {
            let mut dragging = self.dragging;
            dragging.set(is_dragging);
        }
        consumed
    }

    /// Draw the last skipped drag frame once the throttle interval elapses.
    fn schedule_flush(&self) {
        let Some(delay) = self
            .run(|vp| vp.needs_flush().then(|| vp.flush_delay(dom::now_ms())))
            .flatten()
        else {
            return;
        };
        if self.flush_scheduled.replace(true) {
            return;
        }
        let ctx = self.clone();
        spawn(async move {
            TimeoutFuture::new(delay.ceil() as u32).await;
            ctx.flush_scheduled.set(false);
            ctx.run(MapViewport::flush);
        });
    }

    fn teardown(&self) {
        if let Ok(mut watcher) = self.watcher.try_borrow_mut() {
            watcher.take();
        }
        match self.viewport.try_borrow_mut() {
            Ok(mut slot) => {
                if let Some(viewport) = slot.as_mut() {
                    viewport.destroy();
                }
            }
            Err(_) => tracing::warn!("Viewport busy during teardown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn AtlasMap(
    container_id: String,
    image_path: String,
    markers: ReadSignal<Vec<Marker>>,
    commands: Signal<Vec<ViewportCommand>>,
    #[props(default)] config: ViewportConfig,
    on_marker_click: EventHandler<Marker>,
    on_surface_click: EventHandler<SurfaceClick>,
) -> Element {
    let frame = use_signal(|| None::<Frame>);
    let dragging = use_signal(|| false);
    let mut mount_error = use_signal(|| None::<String>);
    let ctx = use_hook(|| MapContext::new(frame, dragging));
    let image_id = format!("{container_id}-image");
    let mut commands = commands;

    // Markers are replaced wholesale whenever the collaborator's list changes
    {
        let ctx = ctx.clone();
        use_effect(move || {
            let next = markers.read().clone();
            ctx.run(move |vp| vp.update_markers(next));
        });
    }

    // Collaborator requests; left queued until the controller exists
    {
        let ctx = ctx.clone();
        use_effect(move || {
            if commands.read().is_empty() || !ctx.is_installed() {
                return;
            }
            let queued = std::mem::take(&mut *commands.write());
            ctx.run(move |vp| {
                for command in queued {
                    vp.apply(command);
                }
            });
        });
    }

    {
        let ctx = ctx.clone();
        use_effect(use_reactive((&image_path,), move |(path,)| {
            ctx.run(|vp| vp.load_image(&path));
        }));
    }

    {
        let ctx = ctx.clone();
        use_drop(move || ctx.teardown());
    }

    let on_mounted = {
        let ctx = ctx.clone();
        let container_id = container_id.clone();
        let image_path = image_path.clone();
        let image_id = image_id.clone();
        move |_: Event<MountedData>| {
            if ctx.is_installed() {
                return;
            }
            let options = ViewportOptions::new(container_id.clone(), image_path.clone())
                .with_markers(markers.peek().clone())
                .with_config(config);
            let handlers = ViewportHandlers::new()
                .on_marker_click(move |marker: &Marker| on_marker_click.call(marker.clone()))
                .on_surface_click(move |click| on_surface_click.call(click));
            let viewport = match MapViewport::new(options, handlers) {
                Ok(viewport) => viewport,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create map viewport");
                    mount_error.set(Some(e.to_string()));
                    return;
                }
            };
            let container = match dom::resolve_container(&container_id) {
                Ok(element) => element,
                Err(e) => {
                    tracing::error!(error = %e, "Map container not found");
                    mount_error.set(Some(e.to_string()));
                    return;
                }
            };
            ctx.install(viewport);

            // The image may have settled (from cache, or failed) before mount,
            // in which case its load/error event was dropped
            let size = dom::element_size(&container);
            let image = dom::image_state(&image_id);
            let path = image_path.clone();
            let queued = std::mem::take(&mut *commands.write());
            ctx.run(move |vp| {
                vp.container_resized(size);
                match image {
                    ImageState::Loaded(natural) => vp.image_loaded(&path, natural),
                    ImageState::Broken => vp.image_failed(&path),
                    ImageState::Pending => {}
                }
                for command in queued {
                    vp.apply(command);
                }
            });

            let (tx, mut rx) = futures_channel::mpsc::unbounded::<Size>();
            let watcher = ResizeWatcher::observe(&container, move |size| {
                let _ = tx.unbounded_send(size);
            });
            if let Ok(mut slot) = ctx.watcher.try_borrow_mut() {
                *slot = watcher;
            }
            let resize_ctx = ctx.clone();
            spawn(async move {
                use futures_util::StreamExt;

                while let Some(size) = rx.next().await {
                    resize_ctx.run(|vp| vp.container_resized(size));
                }
            });
        }
    };

    let on_image_load = {
        let ctx = ctx.clone();
        let path = image_path.clone();
        let image_id = image_id.clone();
        move |_: Event<ImageData>| {
            // Zero size is reported to the core as a failed load
            let natural = match dom::image_state(&image_id) {
                ImageState::Loaded(natural) => natural,
                ImageState::Broken | ImageState::Pending => Size::ZERO,
            };
            ctx.run(|vp| vp.image_loaded(&path, natural));
        }
    };

    let on_image_error = {
        let ctx = ctx.clone();
        let path = image_path.clone();
        move |_: Event<ImageData>| {
            ctx.run(|vp| vp.image_failed(&path));
        }
    };

    let on_mouse_down = {
        let ctx = ctx.clone();
        let container_id = container_id.clone();
        move |evt: Event<MouseData>| {
            let client = evt.client_coordinates();
            let Some(position) = coords::container_point(client.x, client.y, &container_id) else {
                return;
            };
            let button = pointer_button(evt.trigger_button());
            if ctx.feed(InputEvent::PointerDown { position, button }) {
                evt.prevent_default();
            }
        }
    };

    let on_mouse_move = {
        let ctx = ctx.clone();
        let container_id = container_id.clone();
        move |evt: Event<MouseData>| {
            if !*ctx.dragging.peek() {
                return;
            }
            let client = evt.client_coordinates();
            let Some(position) = coords::container_point(client.x, client.y, &container_id) else {
                return;
            };
            ctx.feed(InputEvent::PointerMove {
                position,
                now_ms: dom::now_ms(),
            });
            ctx.schedule_flush();
        }
    };

    let on_mouse_up = {
        let ctx = ctx.clone();
        let container_id = container_id.clone();
        move |evt: Event<MouseData>| {
            let client = evt.client_coordinates();
            let Some(position) = coords::container_point(client.x, client.y, &container_id) else {
                return;
            };
            ctx.feed(InputEvent::PointerUp { position });
        }
    };

    let on_mouse_leave = {
        let ctx = ctx.clone();
        move |_: Event<MouseData>| {
            ctx.feed(InputEvent::PointerLeave);
        }
    };

    let on_click = {
        let ctx = ctx.clone();
        let container_id = container_id.clone();
        move |evt: Event<MouseData>| {
            let client = evt.client_coordinates();
            let Some(position) = coords::container_point(client.x, client.y, &container_id) else {
                return;
            };
            ctx.feed(InputEvent::Click { position });
        }
    };

    let on_wheel = {
        let ctx = ctx.clone();
        let container_id = container_id.clone();
        move |evt: Event<WheelData>| {
            evt.prevent_default();
            let delta: WheelDelta = evt.data().delta();
            let client = evt.data().client_coordinates();
            let Some(position) = coords::container_point(client.x, client.y, &container_id) else {
                return;
            };
            ctx.feed(InputEvent::Wheel {
                position,
                delta_y: coords::wheel_delta_y(delta),
            });
        }
    };

    let on_key_down = {
        let ctx = ctx.clone();
        move |evt: Event<KeyboardData>| {
            let key = evt.key().to_string();
            if ctx.feed(InputEvent::Key { key }) {
                evt.prevent_default();
                evt.stop_propagation();
            }
        }
    };

    let on_zoom_in = {
        let ctx = ctx.clone();
        move |_: ()| {
            ctx.run(MapViewport::zoom_in);
        }
    };
    let on_zoom_out = {
        let ctx = ctx.clone();
        move |_: ()| {
            ctx.run(MapViewport::zoom_out);
        }
    };
    let on_reset = {
        let ctx = ctx.clone();
        move |_: ()| {
            ctx.run(MapViewport::reset_view);
        }
    };

    let current = frame.read().clone();
    let mount_message = mount_error.read().clone();
    let container_class = if *dragging.read() {
        "atlas-map dragging"
    } else {
        "atlas-map"
    };
    let transform_style = current.as_ref().map(Frame::css_transform).unwrap_or_default();
    let projected = current
        .as_ref()
        .map(|f| f.markers.clone())
        .unwrap_or_default();
    let scale = current.as_ref().map_or(1.0, |f| f.scale);
    let status = current
        .as_ref()
        .map_or(ImageStatus::Loading, |f| f.image.status);
    // A failed image is replaced by a plain block the size of the container
    let fallback_style = current
        .as_ref()
        .filter(|f| f.image.status == ImageStatus::Failed && f.scale > 0.0)
        .map(|f| {
            format!(
                "width: {}px; height: {}px;",
                f.image.width / f.scale,
                f.image.height / f.scale
            )
        });
    let image_class = if status == ImageStatus::Failed {
        "atlas-image hidden"
    } else {
        "atlas-image"
    };

    rsx! {
        div {
            id: "{container_id}",
            class: "{container_class}",
            tabindex: "0",
            onmounted: on_mounted,
            onmousedown: on_mouse_down,
            onmousemove: on_mouse_move,
            onmouseup: on_mouse_up,
            onmouseleave: on_mouse_leave,
            onclick: on_click,
            onwheel: on_wheel,
            onkeydown: on_key_down,

            // Transformed layer: background image (or its fallback)
            div {
                class: "atlas-surface",
                style: "{transform_style}",

                if let Some(style) = fallback_style {
                    div { class: "atlas-fallback", style: "{style}" }
                }
                img {
                    id: "{image_id}",
                    class: "{image_class}",
                    src: "{image_path}",
                    alt: "",
                    draggable: "false",
                    onload: on_image_load,
                    onerror: on_image_error,
                }
            }

            // Markers are drawn in container pixels, outside the transform
            MarkerLayer { markers: projected }

            if let Some(message) = mount_message {
                div { class: "atlas-status atlas-status-error", "Map unavailable: {message}" }
            } else if status == ImageStatus::Loading {
                div { class: "atlas-status", "Loading map\u{2026}" }
            }
            if status == ImageStatus::Failed {
                div { class: "atlas-status atlas-status-error", "Map image unavailable" }
            }

            ViewportControls {
                scale,
                on_zoom_in,
                on_zoom_out,
                on_reset,
            }
        }
    }
}
