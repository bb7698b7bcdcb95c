pub mod atlas_map;
pub mod help_overlay;
pub mod marker_layer;
pub mod viewport_controls;
