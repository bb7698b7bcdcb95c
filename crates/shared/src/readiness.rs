//! Readiness tracking for the background image and container, plus the
//! single-slot queue for centering requests that arrive too early.

use crate::models::{MarkerId, Size};
use crate::viewport::Bounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageStatus {
    Loading,
    Loaded { natural: Size },
    /// The image could not be loaded; the viewport draws a plain background
    /// the size of the container instead.
    Failed,
}

/// What the viewport knows about its drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    image_path: Option<String>,
    status: ImageStatus,
    container: Size,
}

impl Surface {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: Some(image_path.into()),
            status: ImageStatus::Loading,
            container: Size::ZERO,
        }
    }

    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }

    pub fn status(&self) -> ImageStatus {
        self.status
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// Start loading a different image. Returns `false` if it's the same
    /// path that is already current.
    pub fn replace_image(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.image_path.as_deref() == Some(path.as_str()) {
            return false;
        }
        self.image_path = Some(path);
        self.status = ImageStatus::Loading;
        true
    }

    /// Whether a load/error notification for `path` is about the current image.
    pub fn is_current(&self, path: &str) -> bool {
        self.image_path.as_deref() == Some(path)
    }

    pub fn set_status(&mut self, status: ImageStatus) {
        self.status = status;
    }

    pub fn set_container(&mut self, size: Size) {
        self.container = size;
    }

    /// Drop the image reference on teardown.
    pub fn release(&mut self) {
        self.image_path = None;
        self.status = ImageStatus::Loading;
    }

    /// Dimensions of what is drawn as the background. A failed image
    /// falls back to the container size.
    pub fn image_size(&self) -> Option<Size> {
        match self.status {
            ImageStatus::Loaded { natural } if natural.is_measurable() => Some(natural),
            ImageStatus::Failed if self.container.is_measurable() => Some(self.container),
            _ => None,
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        if !self.container.is_measurable() {
            return None;
        }
        self.image_size().map(|image| Bounds {
            image,
            container: self.container,
        })
    }

    /// The image has settled and the container has a measurable size.
    pub fn is_ready(&self) -> bool {
        self.bounds().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCenterRequest {
    pub marker_id: MarkerId,
    pub target_zoom: Option<f64>,
}

/// Holds at most one centering request until the surface is ready.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadinessQueue {
    pending: Option<PendingCenterRequest>,
}

impl ReadinessQueue {
    /// Store a request, replacing any earlier one.
    pub fn defer(&mut self, request: PendingCenterRequest) {
        if let Some(previous) = self.pending.replace(request) {
            tracing::debug!(marker_id = %previous.marker_id, "Replacing pending center request");
        }
    }

    pub fn pending(&self) -> Option<&PendingCenterRequest> {
        self.pending.as_ref()
    }

    /// Hand over the pending request once `ready` holds. The request is
    /// removed, so it can only be replayed once.
    pub fn take_if_ready(&mut self, ready: bool) -> Option<PendingCenterRequest> {
        if ready {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
