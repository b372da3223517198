use dioxus::prelude::*;

use super::NavBar;

/// Public page; readable without an account.
#[component]
pub fn Materials() -> Element {
    rsx! {
        NavBar {}
        div {
            class: "page",
            h1 { "Study Materials" }
            p { class: "muted", "Shared notes and past papers from your courses." }
        }
    }
}
