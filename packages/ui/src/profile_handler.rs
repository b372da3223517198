//! Background profile creation for freshly signed-in users.

use dioxus::prelude::*;

use crate::auth::{use_auth, use_services};
use crate::notices::{push_notice, use_notices};

/// Renders nothing. Whenever the session reports an identity without a
/// profile row, runs the reconciler once for that identity.
#[component]
pub fn ProfileCreationHandler() -> Element {
    let services = use_services();
    let auth = use_auth();
    let mut notices = use_notices();
    let mut attempted = use_signal(|| Option::<String>::None);

    use_effect(move || {
        let target = {
            let state = auth.read();
            if state.needs_profile() {
                state.identity.as_ref().map(|i| i.id.clone())
            } else {
                None
            }
        };
        let Some(id) = target else {
            return;
        };
        if attempted.peek().as_deref() == Some(id.as_str()) {
            return;
        }
        attempted.set(Some(id));

        let reconciler = services.reconciler.clone();
        let session = services.session.clone();
        spawn(async move {
            let outcome = reconciler.reconcile(&session).await;
            tracing::debug!(?outcome, "profile reconciliation finished");
            if let Some(notice) = outcome.notice() {
                push_notice(&mut notices, notice.clone());
            }
        });
    });

    rsx! {}
}
