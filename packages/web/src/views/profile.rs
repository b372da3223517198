use api::ProfileLookup;
use dioxus::prelude::*;
use ui::{use_auth, LogoutButton};

use super::NavBar;
use crate::Route;

/// The signed-in user's profile. The server guard keeps anonymous visitors
/// out; the loading and missing states cover the client catching up.
#[component]
pub fn Profile() -> Element {
    let auth = use_auth();
    let state = auth();

    let body = if state.loading {
        rsx! { p { class: "muted", "Loading your profile..." } }
    } else if let Some(profile) = state.profile.as_ref() {
        let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "not set".to_string());
        let student_id = field(&profile.student_id);
        let major = field(&profile.major);
        let year = field(&profile.year);
        rsx! {
            h1 { "{profile.display_name()}" }
            dl {
                dt { "Email" }
                dd { "{profile.email}" }
                dt { "Role" }
                dd { "{profile.role}" }
                dt { "Student ID" }
                dd { "{student_id}" }
                dt { "Major" }
                dd { "{major}" }
                dt { "Year" }
                dd { "{year}" }
            }
            if let Some(bio) = profile.bio.as_ref() {
                p { "{bio}" }
            }
            Link { to: Route::ProfileSetup {}, "Edit profile" }
        }
    } else if state.identity.is_none() {
        rsx! {
            p {
                "You are not signed in. "
                Link { to: Route::Login {}, "Sign in" }
            }
        }
    } else {
        let message = match &state.lookup {
            ProfileLookup::Failed(reason) => format!("Your profile could not be loaded: {reason}"),
            _ => "Setting up your profile...".to_string(),
        };
        rsx! {
            p { "{message}" }
            Link { to: Route::ProfileSetup {}, "Set up your profile" }
        }
    };

    rsx! {
        NavBar {}
        div {
            class: "page",
            {body}
            if state.identity.is_some() {
                LogoutButton { class: "btn" }
            }
        }
    }
}
