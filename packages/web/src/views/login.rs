//! Login page view with email/password form.

use api::registration::{sign_in, sign_in_failed};
use dioxus::prelude::*;
use ui::{push_notice, use_auth, use_notices, use_services};

use super::{go_to, NavBar};
use crate::Route;

/// Login page component.
#[component]
pub fn Login() -> Element {
    let auth = use_auth();
    let services = use_services();
    let mut notices = use_notices();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut loading = use_signal(|| false);

    let handle_login = move |evt: FormEvent| {
        evt.prevent_default();
        let services = services.clone();
        spawn(async move {
            loading.set(true);
            match sign_in(&*services.auth, email().trim(), &password()).await {
                Ok(session) => {
                    // The guard only lets the redirect through once the
                    // cookie session holds the new tokens.
                    if let Some(sync) = services.sync() {
                        if let Err(e) = sync.push(Some(&session)).await {
                            tracing::warn!("session sync after sign-in failed: {}", e);
                        }
                    }
                    go_to(&redirect_target());
                }
                Err(e) => {
                    loading.set(false);
                    push_notice(&mut notices, sign_in_failed(&e));
                }
            }
        });
    };

    let state = auth();
    if !state.loading && state.identity.is_some() && !loading() {
        return rsx! {
            NavBar {}
            div {
                class: "page",
                p { "You are already signed in." }
                Link { to: Route::Home {}, "Go to the home page" }
            }
        };
    }

    rsx! {
        NavBar {}
        div {
            class: "page",
            h1 { "Sign In" }

            form {
                class: "form",
                onsubmit: handle_login,

                input {
                    r#type: "email",
                    placeholder: "Email",
                    value: email(),
                    oninput: move |evt: FormEvent| email.set(evt.value()),
                }
                input {
                    r#type: "password",
                    placeholder: "Password",
                    value: password(),
                    oninput: move |evt: FormEvent| password.set(evt.value()),
                }
                button {
                    class: "btn",
                    r#type: "submit",
                    disabled: loading(),
                    if loading() { "Signing in..." } else { "Sign in" }
                }
            }

            p {
                class: "muted",
                "No account yet? "
                Link { to: Route::Register {}, "Register" }
            }
        }
    }
}

/// Where to go after signing in: the guard's `redirectTo`, if it is a path
/// on this site.
fn redirect_target() -> String {
    #[cfg(target_arch = "wasm32")]
    {
        let search = web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        let requested = search
            .trim_start_matches('?')
            .split('&')
            .find_map(|pair| pair.strip_prefix("redirectTo="))
            .and_then(|raw| js_sys::decode_uri_component(raw).ok())
            .map(String::from);
        local_path(requested)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        local_path(None)
    }
}

fn local_path(requested: Option<String>) -> String {
    requested
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| "/".to_string())
}

#[cfg(test)]
mod tests {
    use super::local_path;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(local_path(Some("/profile/setup".into())), "/profile/setup");
        assert_eq!(local_path(Some("https://evil.example".into())), "/");
        assert_eq!(local_path(Some("//evil.example/x".into())), "/");
        assert_eq!(local_path(None), "/");
    }
}
