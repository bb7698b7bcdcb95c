pub mod config;
pub mod error;
pub mod input;
pub mod map_viewport;
pub mod markers;
pub mod models;
pub mod readiness;
pub mod throttle;
pub mod transform;
pub mod viewport;

pub use config::ViewportConfig;
pub use error::ViewportError;
pub use map_viewport::{
    Frame, MapViewport, Phase, ViewportCommand, ViewportHandlers, ViewportOptions,
};
