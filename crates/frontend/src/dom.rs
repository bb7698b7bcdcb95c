use atlas_shared::models::Size;
use atlas_shared::ViewportError;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub fn resolve_container(container_id: &str) -> Result<web_sys::Element, ViewportError> {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(container_id))
        .ok_or_else(|| ViewportError::UnresolvableContainer(container_id.to_string()))
}

pub fn element_size(element: &web_sys::Element) -> Size {
    let rect = element.get_bounding_client_rect();
    Size::new(rect.width(), rect.height())
}

/// What the browser currently knows about an `<img>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageState {
    Loaded(Size),
    /// Finished without decoding anything (404, bad data).
    Broken,
    Pending,
}

fn classify_image(complete: bool, natural: Size) -> ImageState {
    if !complete {
        ImageState::Pending
    } else if natural.is_measurable() {
        ImageState::Loaded(natural)
    } else {
        ImageState::Broken
    }
}

/// Inspect the `<img>` with `image_id`. A missing element counts as pending.
pub fn image_state(image_id: &str) -> ImageState {
    let image = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(image_id))
        .and_then(|e| e.dyn_into::<web_sys::HtmlImageElement>().ok());
    let Some(image) = image else {
        return ImageState::Pending;
    };
    classify_image(
        image.complete(),
        Size::new(
            f64::from(image.natural_width()),
            f64::from(image.natural_height()),
        ),
    )
}

/// Monotonic milliseconds for render throttling.
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Reports the container's size whenever it, or its parent, changes size.
/// Observation stops when the watcher is dropped.
pub struct ResizeWatcher {
    observer: web_sys::ResizeObserver,
    _callback: Closure<dyn FnMut(JsValue)>,
}

impl ResizeWatcher {
    pub fn observe(container: &web_sys::Element, mut on_resize: impl FnMut(Size) + 'static) -> Option<Self> {
        let target = container.clone();
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |_entries: JsValue| {
            on_resize(element_size(&target));
        });

        let observer = match web_sys::ResizeObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(e) => {
                tracing::warn!(error = ?e, "ResizeObserver unavailable, container size will not be tracked");
                return None;
            }
        };
        observer.observe(container);
        if let Some(parent) = container.parent_element() {
            observer.observe(&parent);
        }

        Some(Self {
            observer,
            _callback: callback,
        })
    }
}

impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_image_is_pending() {
        assert_eq!(classify_image(false, Size::ZERO), ImageState::Pending);
        assert_eq!(classify_image(false, Size::new(640.0, 480.0)), ImageState::Pending);
    }

    #[test]
    fn test_complete_image_with_size_is_loaded() {
        assert_eq!(
            classify_image(true, Size::new(640.0, 480.0)),
            ImageState::Loaded(Size::new(640.0, 480.0))
        );
    }

    #[test]
    fn test_complete_image_without_size_is_broken() {
        assert_eq!(classify_image(true, Size::ZERO), ImageState::Broken);
        assert_eq!(classify_image(true, Size::new(640.0, 0.0)), ImageState::Broken);
    }
}
