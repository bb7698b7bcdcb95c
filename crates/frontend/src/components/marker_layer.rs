use atlas_shared::markers::ProjectedMarker;
use dioxus::prelude::*;

const MARKER_RADIUS: f64 = 14.0;
const GLYPH_SIZE: f64 = 16.0;
const LABEL_SIZE: f64 = 13.0;

const UNKNOWN_NAME: &str = "Unknown location";

// ---------------------------------------------------------------------------
// SVG builder
// ---------------------------------------------------------------------------

/// Build the marker overlay. Positions are already in container pixels,
/// so the SVG has no viewBox and is never transformed.
fn build_marker_svg(markers: &[ProjectedMarker]) -> String {
    let mut svg = String::with_capacity(256 + markers.len() * 384);
    svg.push_str(
        r#"<svg xmlns="http://www.w3.org/2000/svg" style="position:absolute;top:0;left:0;width:100%;height:100%;overflow:visible;pointer-events:none;">"#,
    );
    // Selected marker last so it paints on top of its neighbours
    for marker in markers.iter().filter(|m| !m.selected) {
        build_marker(&mut svg, marker);
    }
    for marker in markers.iter().filter(|m| m.selected) {
        build_marker(&mut svg, marker);
    }
    svg.push_str("</svg>");
    svg
}

fn display_name(marker: &ProjectedMarker) -> String {
    if marker.discovered {
        escape_xml(&marker.name)
    } else {
        UNKNOWN_NAME.to_string()
    }
}

fn build_marker(svg: &mut String, marker: &ProjectedMarker) {
    let x = marker.screen.x;
    let y = marker.screen.y;
    let class = marker.appearance.class;
    let glyph = marker.appearance.glyph;
    let title = display_name(marker);

    svg.push_str(&format!(
        r##"<g class="marker {class}" data-marker-id="{}" role="img"><title>{title}</title>"##,
        escape_xml(&marker.id)
    ));
    svg.push_str(&format!(
        r##"<circle cx="{x}" cy="{y}" r="{MARKER_RADIUS}" class="marker-disc"/>"##
    ));
    svg.push_str(&format!(
        r##"<text x="{x}" y="{y}" font-size="{GLYPH_SIZE}" text-anchor="middle" dominant-baseline="central">{glyph}</text>"##
    ));
    if marker.selected {
        build_selection_ring(svg, x, y);
    }
    if marker.show_label {
        build_label(svg, x, y, &title);
    }
    svg.push_str("</g>");
}

fn build_selection_ring(svg: &mut String, cx: f64, cy: f64) {
    let r = MARKER_RADIUS + 6.0;
    svg.push_str(&format!(
        r##"<circle cx="{cx}" cy="{cy}" r="{r}" fill="none" stroke="white" stroke-width="2" stroke-dasharray="5 3" class="marker-selection"><animate attributeName="opacity" values="0.5;1;0.5" dur="1.2s" repeatCount="indefinite"/></circle>"##
    ));
}

fn build_label(svg: &mut String, x: f64, y: f64, text: &str) {
    let label_y = y - MARKER_RADIUS - 10.0;
    svg.push_str(&format!(
        r##"<text x="{x}" y="{label_y}" font-size="{LABEL_SIZE}" font-family="sans-serif" font-weight="700" text-anchor="middle" fill="white" stroke="rgba(0,0,0,0.7)" stroke-width="4" paint-order="stroke" class="marker-label">{text}</text>"##
    ));
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[component]
pub fn MarkerLayer(markers: Vec<ProjectedMarker>) -> Element {
    let svg_html = build_marker_svg(&markers);
    rsx! {
        div {
            class: "atlas-markers",
            dangerous_inner_html: "{svg_html}",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_shared::markers::appearance;
    use atlas_shared::models::{MarkerKind, Point};

    fn projected(id: &str, name: &str, x: f64, y: f64, selected: bool, discovered: bool) -> ProjectedMarker {
        ProjectedMarker {
            id: id.to_string(),
            name: name.to_string(),
            kind: MarkerKind::Town,
            discovered,
            screen: Point::new(x, y),
            appearance: appearance(MarkerKind::Town, discovered),
            selected,
            show_label: selected,
        }
    }

    #[test]
    fn test_marker_drawn_at_screen_position() {
        let mut svg = String::new();
        build_marker(&mut svg, &projected("a", "Aldmoor", 120.0, 80.5, false, true));
        assert!(svg.contains(r#"cx="120""#));
        assert!(svg.contains(r#"cy="80.5""#));
        assert!(svg.contains("marker-town"));
    }

    #[test]
    fn test_only_selected_marker_has_ring_and_label() {
        let svg = build_marker_svg(&[
            projected("a", "Aldmoor", 10.0, 10.0, false, true),
            projected("b", "Blackfen", 50.0, 50.0, true, true),
        ]);
        assert_eq!(svg.matches("marker-selection").count(), 1);
        assert_eq!(svg.matches("marker-label").count(), 1);
        assert!(svg.contains(">Blackfen</text>"));
    }

    #[test]
    fn test_selected_marker_painted_last() {
        let svg = build_marker_svg(&[
            projected("a", "Aldmoor", 10.0, 10.0, true, true),
            projected("b", "Blackfen", 50.0, 50.0, false, true),
        ]);
        let a = svg.find(r#"data-marker-id="a""#).unwrap();
        let b = svg.find(r#"data-marker-id="b""#).unwrap();
        assert!(b < a);
    }

    #[test]
    fn test_undiscovered_marker_hides_name() {
        let svg = build_marker_svg(&[projected("x", "Secret Vault", 10.0, 10.0, true, false)]);
        assert!(!svg.contains("Secret Vault"));
        assert!(svg.contains(UNKNOWN_NAME));
        assert!(svg.contains("marker-undiscovered"));
    }

    #[test]
    fn test_names_are_escaped() {
        let svg = build_marker_svg(&[projected("q", "<Tom & Jerry's>", 1.0, 1.0, true, true)]);
        assert!(svg.contains("&lt;Tom &amp; Jerry&#39;s&gt;"));
        assert!(!svg.contains("<Tom"));
    }

    #[test]
    fn test_empty_overlay_is_valid_svg() {
        let svg = build_marker_svg(&[]);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(!svg.contains("<g"));
    }
}
