use serde_json::Value;

use crate::models::{Marker, MarkerId, MarkerKind, Point, Size};
use crate::transform;
use crate::viewport::ViewportState;

/// Glyph and CSS class a marker is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerAppearance {
    pub glyph: &'static str,
    pub class: &'static str,
}

const UNDISCOVERED: MarkerAppearance = MarkerAppearance {
    glyph: "?",
    class: "marker-undiscovered",
};

/// Pick the visual for a marker. Undiscovered markers all look alike so
/// the map doesn't give away what they are.
pub fn appearance(kind: MarkerKind, discovered: bool) -> MarkerAppearance {
    if !discovered {
        return UNDISCOVERED;
    }
    match kind {
        MarkerKind::City => MarkerAppearance { glyph: "\u{1F3F0}", class: "marker-city" },
        MarkerKind::Town => MarkerAppearance { glyph: "\u{1F3D8}", class: "marker-town" },
        MarkerKind::Village => MarkerAppearance { glyph: "\u{1F3E0}", class: "marker-village" },
        MarkerKind::Dungeon => MarkerAppearance { glyph: "\u{1F480}", class: "marker-dungeon" },
        MarkerKind::Landmark => MarkerAppearance { glyph: "\u{26F0}", class: "marker-landmark" },
        MarkerKind::Camp => MarkerAppearance { glyph: "\u{26FA}", class: "marker-camp" },
        MarkerKind::Other => MarkerAppearance { glyph: "\u{2022}", class: "marker-other" },
    }
}

/// A marker resolved to screen-space for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedMarker {
    pub id: MarkerId,
    pub name: String,
    pub kind: MarkerKind,
    pub discovered: bool,
    pub screen: Point,
    pub appearance: MarkerAppearance,
    pub selected: bool,
    /// Labels are only shown for the selected marker.
    pub show_label: bool,
}

/// The viewport's working copy of the collaborator's markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
}

impl MarkerLayer {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self { markers }
    }

    /// Build from loosely-typed input. Anything that isn't an array yields
    /// an empty layer; array entries that don't parse are skipped.
    pub fn from_value(value: &Value) -> Self {
        let Some(items) = value.as_array() else {
            tracing::warn!(kind = value_kind(value), "Markers are not a list, treating as empty");
            return Self::default();
        };
        let markers = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<Marker>(item.clone()) {
                Ok(marker) => Some(marker),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping malformed marker");
                    None
                }
            })
            .collect();
        Self { markers }
    }

    pub fn replace(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// Natural-pixel position of a marker on an image of size `natural`.
    pub fn image_position(marker: &Marker, natural: Size) -> Point {
        transform::percent_to_image(marker.percent(), natural)
    }

    /// Project every marker to screen-space. Markers outside the container
    /// are kept; they simply land off-screen.
    pub fn project(
        &self,
        state: &ViewportState,
        natural: Size,
        selected: Option<&str>,
    ) -> Vec<ProjectedMarker> {
        self.markers
            .iter()
            .map(|m| {
                let screen = transform::image_to_screen(Self::image_position(m, natural), state);
                let is_selected = selected == Some(m.id.as_str());
                ProjectedMarker {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    kind: m.kind,
                    discovered: m.discovered,
                    screen,
                    appearance: appearance(m.kind, m.discovered),
                    selected: is_selected,
                    show_label: is_selected,
                }
            })
            .collect()
    }

    /// Index of the marker hit by a click at `click` (screen-space).
    pub fn hit_test(
        &self,
        state: &ViewportState,
        natural: Size,
        click: Point,
        radius: f64,
    ) -> Option<usize> {
        let positions: Vec<Point> = self
            .markers
            .iter()
            .map(|m| transform::image_to_screen(Self::image_position(m, natural), state))
            .collect();
        find_nearest(&positions, click, radius)
    }
}

/// Index of the position nearest to `click` within `radius` (inclusive).
/// Equal distances resolve to the earlier entry.
pub fn find_nearest(positions: &[Point], click: Point, radius: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, pos) in positions.iter().enumerate() {
        let dist = pos.distance(click);
        if dist > radius {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
