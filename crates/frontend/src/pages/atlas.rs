use atlas_shared::map_viewport::ViewportCommand;
use atlas_shared::markers::MarkerLayer;
use atlas_shared::models::{Marker, MarkerKind, SurfaceClick};
use atlas_shared::ViewportConfig;
use dioxus::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::components::atlas_map::AtlasMap;
use crate::components::help_overlay::HelpOverlay;

const MAP_CONTAINER_ID: &str = "atlas-map-container";

/// Zoom used when the page is opened on a specific place.
const FOCUS_ZOOM: f64 = 2.5;

const ATLAS_JSON: &str = include_str!("../../assets/atlas.json");

const FALLBACK_MAP: &str = "/static/maps/realm.webp";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct MapChoice {
    name: String,
    path: String,
}

#[derive(Debug, Default, Deserialize)]
struct AtlasDocument {
    #[serde(default)]
    maps: Vec<MapChoice>,
    #[serde(default)]
    config: serde_json::Value,
    #[serde(default)]
    markers: serde_json::Value,
}

/// The atlas the page starts with: selectable maps, viewport tunables and
/// seed markers.
#[derive(Debug, Clone, PartialEq)]
struct AtlasDefinition {
    maps: Vec<MapChoice>,
    config: ViewportConfig,
    markers: Vec<Marker>,
}

/// Parse the bundled atlas document. Every part degrades on its own: bad
/// marker entries are skipped, a bad config falls back to defaults, and a
/// document that isn't JSON at all yields one default map with no markers.
fn load_atlas(json: &str) -> AtlasDefinition {
    let document = serde_json::from_str::<AtlasDocument>(json).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Atlas document is not valid JSON");
        AtlasDocument::default()
    });

    let config = if document.config.is_null() {
        ViewportConfig::default()
    } else {
        ViewportConfig::from_value(document.config).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default viewport configuration");
            ViewportConfig::default()
        })
    };

    let mut maps = document.maps;
    if maps.is_empty() {
        maps.push(MapChoice {
            name: "Map".to_string(),
            path: FALLBACK_MAP.to_string(),
        });
    }

    AtlasDefinition {
        maps,
        config,
        markers: MarkerLayer::from_value(&document.markers).markers().to_vec(),
    }
}

/// A new, undiscovered marker where the user clicked.
fn dropped_marker(click: SurfaceClick, existing: usize) -> Marker {
    Marker {
        id: Uuid::new_v4().to_string(),
        name: format!("Uncharted site {}", existing + 1),
        kind: MarkerKind::Other,
        x: click.percent.x.clamp(0.0, 100.0),
        y: click.percent.y.clamp(0.0, 100.0),
        discovered: false,
    }
}

fn toggle_discovered(markers: &mut [Marker], id: &str) -> bool {
    match markers.iter_mut().find(|m| m.id == id) {
        Some(marker) => {
            marker.discovered = !marker.discovered;
            true
        }
        None => false,
    }
}

fn focus_commands(focus: Option<&str>) -> Vec<ViewportCommand> {
    let Some(id) = focus else {
        return Vec::new();
    };
    vec![
        ViewportCommand::Select(Some(id.to_string())),
        ViewportCommand::CenterOn {
            marker_id: id.to_string(),
            target_zoom: Some(FOCUS_ZOOM),
        },
    ]
}

#[component]
pub fn Atlas(focus: Option<String>) -> Element {
    let atlas = use_hook(|| load_atlas(ATLAS_JSON));
    let mut markers = use_signal(|| atlas.markers.clone());
    let mut selected = use_signal(|| focus.clone());
    let mut commands = use_signal(|| focus_commands(focus.as_deref()));
    let mut map_path = use_signal(|| atlas.maps[0].path.clone());
    let mut show_help = use_signal(|| false);
    let maps = atlas.maps.clone();

    let current_map = map_path.read().clone();
    let current_selected = selected.read().clone();

    // Sidebar rows (id, label, css class)
    let rows: Vec<(String, String, String)> = markers
        .read()
        .iter()
        .map(|m| {
            let label = if m.discovered {
                format!("{} \u{00b7} {}", m.name, m.kind)
            } else {
                "Unknown location".to_string()
            };
            let mut class = String::from("place");
            if !m.discovered {
                class.push_str(" undiscovered");
            }
            if current_selected.as_deref() == Some(m.id.as_str()) {
                class.push_str(" selected");
            }
            (m.id.clone(), label, class)
        })
        .collect();

    rsx! {
        div {
            class: "app",
            onkeydown: move |evt: Event<KeyboardData>| {
                match evt.key().to_string().as_str() {
                    "h" | "H" | "?" => {
                        let visible = *show_help.read();
                        show_help.set(!visible);
                    }
                    "Escape" => {
                        show_help.set(false);
                        selected.set(None);
                        commands.write().push(ViewportCommand::Select(None));
                    }
                    "d" | "D" => {
                        let Some(id) = selected.read().clone() else { return };
                        if toggle_discovered(&mut markers.write(), &id) {
                            tracing::debug!(marker_id = %id, "Toggled discovered");
                        }
                    }
                    _ => {}
                }
            },

            div { class: "header",
                h1 { "Atlas" }
                button {
                    class: "help-button",
                    onclick: move |_| show_help.set(true),
                    "?"
                }
            }

            div { class: "sidebar",
                div { class: "panel",
                    h3 { "Map" }
                    select {
                        value: "{current_map}",
                        onchange: move |evt: Event<FormData>| {
                            map_path.set(evt.value().to_string());
                        },
                        for choice in maps {
                            option {
                                value: "{choice.path}",
                                selected: current_map == choice.path,
                                "{choice.name}"
                            }
                        }
                    }
                }

                div { class: "panel",
                    h3 { "Places" }
                    ul { class: "place-list",
                        for (id, label, class) in rows {
                            li {
                                key: "{id}",
                                class: "{class}",
                                onclick: move |_| {
                                    selected.set(Some(id.clone()));
                                    let mut queue = commands.write();
                                    queue.push(ViewportCommand::Select(Some(id.clone())));
                                    queue.push(ViewportCommand::CenterOn {
                                        marker_id: id.clone(),
                                        target_zoom: None,
                                    });
                                },
                                "{label}"
                            }
                        }
                    }
                }
            }

            AtlasMap {
                container_id: MAP_CONTAINER_ID.to_string(),
                image_path: current_map.clone(),
                markers: markers,
                commands: commands,
                config: atlas.config,
                on_marker_click: move |marker: Marker| {
                    selected.set(Some(marker.id));
                },
                on_surface_click: move |click: SurfaceClick| {
                    let marker = dropped_marker(click, markers.read().len());
                    tracing::info!(
                        marker_id = %marker.id,
                        x = marker.x,
                        y = marker.y,
                        "Dropped marker"
                    );
                    markers.write().push(marker);
                },
            }

            HelpOverlay { show: show_help }
        }
    }
}
