use dioxus::prelude::*;
use ui::use_auth;

use super::NavBar;
use crate::Route;

#[component]
pub fn Home() -> Element {
    let auth = use_auth();
    let state = auth();

    let greeting = match (&state.profile, &state.identity) {
        (Some(profile), _) => format!("Welcome back, {}", profile.display_name()),
        (None, Some(identity)) => format!("Welcome, {}", identity.display_name()),
        (None, None) => "Welcome to Campus Hub".to_string(),
    };
    let incomplete = state.identity.is_some()
        && !state.loading
        && !state.profile.as_ref().is_some_and(|p| p.is_complete());

    rsx! {
        NavBar {}
        div {
            class: "page",
            h1 { "{greeting}" }
            if state.loading {
                p { class: "muted", "Checking your session..." }
            } else if incomplete {
                p {
                    "Your profile is missing some details. "
                    Link { to: Route::ProfileSetup {}, "Finish setting it up" }
                }
            } else if state.identity.is_none() {
                p {
                    class: "muted",
                    "Sign in to see your courses and study groups."
                }
            }
        }
    }
}
