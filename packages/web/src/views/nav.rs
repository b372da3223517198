use dioxus::prelude::*;
use ui::{use_auth, LogoutButton};

use crate::Route;

#[component]
pub fn NavBar() -> Element {
    let auth = use_auth();
    let state = auth();

    rsx! {
        nav {
            class: "nav",
            Link { to: Route::Home {}, "Campus Hub" }
            Link { to: Route::Materials {}, "Materials" }
            if let Some(identity) = state.identity.as_ref() {
                Link { to: Route::Profile {}, "{identity.display_name()}" }
                LogoutButton { class: "btn" }
            } else if !state.loading {
                Link { to: Route::Login {}, "Sign in" }
                Link { to: Route::Register {}, "Register" }
            }
        }
    }
}
