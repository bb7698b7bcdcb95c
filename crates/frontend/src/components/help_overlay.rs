use dioxus::prelude::*;

#[component]
pub fn HelpOverlay(show: Signal<bool>) -> Element {
    if !*show.read() {
        return rsx! {};
    }

    rsx! {
        div {
            class: "help-overlay-backdrop",
            onclick: move |_| show.set(false),

            div {
                class: "help-overlay",
                onclick: move |evt: Event<MouseData>| evt.stop_propagation(),

                h2 { "Help" }

                div { class: "shortcut-section",
                    h3 { "View" }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "+" } " / " kbd { "=" } }
                        span { "Zoom in" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "-" } " / " kbd { "_" } }
                        span { "Zoom out" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "0" } " / " kbd { "R" } }
                        span { "Reset zoom & pan" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "\u{2190}" } kbd { "\u{2191}" } kbd { "\u{2192}" } kbd { "\u{2193}" } }
                        span { "Pan the map" }
                    }
                }

                div { class: "shortcut-section",
                    h3 { "Markers" }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "D" } }
                        span { "Toggle discovered on the selected marker" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "Esc" } }
                        span { "Deselect / close help" }
                    }
                    div { class: "shortcut-row",
                        span { class: "shortcut-keys", kbd { "H" } " / " kbd { "?" } }
                        span { "Toggle this help" }
                    }
                }

                div { class: "help-divider" }

                div { class: "help-info-section",
                    h3 { "Map Interactions" }
                    p { "Scroll to zoom around the cursor, drag to pan. Clicking a marker selects it and shows its name. Clicking empty ground drops a new, undiscovered marker there." }
                }

                div { class: "help-info-section",
                    h3 { "Places List" }
                    p { "Pick a place in the sidebar to center the map on it. Links of the form /place/<id> open the map already centered on that place." }
                }

                button {
                    class: "close-help",
                    onclick: move |_| show.set(false),
                    "Close"
                }
            }
        }
    }
}
