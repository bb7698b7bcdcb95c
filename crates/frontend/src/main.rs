mod components;
mod coords;
mod dom;
mod pages;

use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/place/:id")]
    Place { id: String },
}

#[component]
fn Home() -> Element {
    rsx! {
        pages::atlas::Atlas { focus: None::<String> }
    }
}

#[component]
fn Place(id: String) -> Element {
    rsx! {
        pages::atlas::Atlas { focus: Some(id) }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    tracing::info!("Starting atlas");
    launch(App);
}
