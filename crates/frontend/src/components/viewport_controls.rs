use dioxus::prelude::*;

/// Zoom and reset buttons overlaid on the map. Events stop here so a
/// button press never reaches the map as a drag or surface click.
#[component]
pub fn ViewportControls(
    scale: f64,
    on_zoom_in: EventHandler<()>,
    on_zoom_out: EventHandler<()>,
    on_reset: EventHandler<()>,
) -> Element {
    let percent = (scale * 100.0).round();

    rsx! {
        div {
            class: "viewport-controls",
            onmousedown: move |evt: Event<MouseData>| evt.stop_propagation(),
            onclick: move |evt: Event<MouseData>| evt.stop_propagation(),

            button {
                title: "Zoom in (+)",
                onclick: move |_| on_zoom_in.call(()),
                "+"
            }
            span { class: "zoom-readout", "{percent}%" }
            button {
                title: "Zoom out (-)",
                onclick: move |_| on_zoom_out.call(()),
                "\u{2212}"
            }
            button {
                title: "Reset view (R)",
                onclick: move |_| on_reset.call(()),
                "\u{21BA}"
            }
        }
    }
}
