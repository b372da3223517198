//! Authentication context and hooks for the UI.

use api::{BackendConfig, Notice, NoticeLevel, SessionState};
use dioxus::prelude::*;
use store::CampusConfig;
use tokio::sync::broadcast::error::RecvError;

use crate::notices::{push_notice, use_notices, NoticeLog};
use crate::services::Services;
use crate::{icons::FaRightFromBracket, Icon};

/// Get the current session state.
/// Returns a signal that updates whenever the session store publishes.
pub fn use_auth() -> Signal<SessionState> {
    use_context::<Signal<SessionState>>()
}

pub fn use_services() -> Services {
    use_context::<Services>()
}

/// Provider component that owns the session store.
/// Wrap your app with this component to enable authentication.
#[component]
pub fn AuthProvider(children: Element) -> Element {
    let services = use_context_provider(|| {
        Services::connect(BackendConfig::from_env(), CampusConfig::default())
    });
    use_context_provider(|| Signal::new(NoticeLog::default()));
    let mut auth_state = use_context_provider(|| Signal::new(services.session.snapshot()));

    use_hook(|| {
        // Bootstrap and follow the auth event stream side by side; a slow
        // bootstrap must not hold events back.
        let bootstrap = services.clone();
        spawn(async move {
            bootstrap.restore().await;
            bootstrap.session.initialize().await;
        });
        let listener = services.session.clone();
        spawn(async move {
            listener.listen().await;
        });

        // Mirror the store into the signal.
        let mut watcher = services.session.subscribe();
        spawn(async move {
            loop {
                let next = watcher.borrow_and_update().clone();
                auth_state.set(next);
                if watcher.changed().await.is_err() {
                    break;
                }
            }
        });

        // Keep the server's cookie session in step for the route guard.
        if let Some(sync) = services.sync().cloned() {
            let mut events = services.auth.subscribe();
            spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => {
                            if let Err(e) = sync.push(event.session.as_ref()).await {
                                tracing::warn!("session sync failed: {}", e);
                            }
                        }
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            });
        }
    });

    rsx! {
        {children}
    }
}

/// Button to sign out the current user.
#[component]
pub fn LogoutButton(
    #[props(default = "Sign out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let services = use_services();
    let mut notices = use_notices();

    let onclick = move |_| {
        let session = services.session.clone();
        async move {
            // Local state is cleared either way.
            if let Err(e) = session.sign_out().await {
                push_notice(
                    &mut notices,
                    Notice::new(NoticeLevel::Warning, "Signed Out Locally", e.to_string()),
                );
            }
            #[cfg(target_arch = "wasm32")]
            {
                if let Some(window) = web_sys::window() {
                    let _ = window.location().set_href("/");
                }
            }
        }
    };

    rsx! {
        button {
            class: "{class}",
            onclick: onclick,
            Icon { icon: FaRightFromBracket, width: 14, height: 14 }
            " {label}"
        }
    }
}
