use dioxus::prelude::*;
use ui::AuthDebug;

use super::NavBar;

#[component]
pub fn DebugPage() -> Element {
    rsx! {
        NavBar {}
        div {
            class: "page",
            h1 { "Auth Debug" }
            AuthDebug {}
        }
    }
}
