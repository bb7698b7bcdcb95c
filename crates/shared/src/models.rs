use serde::{Deserialize, Serialize};

pub type MarkerId = String;

/// A 2D point. Used for both image-space and screen-space coordinates;
/// which one is meant is always stated by the function taking it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are finite and strictly positive.
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    City,
    Town,
    Village,
    Dungeon,
    Landmark,
    Camp,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerKind::City => write!(f, "City"),
            MarkerKind::Town => write!(f, "Town"),
            MarkerKind::Village => write!(f, "Village"),
            MarkerKind::Dungeon => write!(f, "Dungeon"),
            MarkerKind::Landmark => write!(f, "Landmark"),
            MarkerKind::Camp => write!(f, "Camp"),
            MarkerKind::Other => write!(f, "Other"),
        }
    }
}

/// A point of interest pinned to the map.
///
/// `x`/`y` are percentages (0–100) of the background image's natural
/// width and height, so a marker stays on the same spot whatever the
/// resolution of the image it is drawn over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub discovered: bool,
}

impl Marker {
    pub fn percent(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Payload handed to the surface-click handler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceClick {
    /// Natural-pixel coordinate of the click on the background image.
    pub image: Point,
    /// The same location as a 0–100 percentage of the image size.
    pub percent: Point,
}
