//! Diagnostics panel for the debug page.

use api::diagnostics::{probe, ConnectionStatus, Diagnostics};
use dioxus::prelude::*;

use crate::auth::{use_auth, use_services};

fn yes_no(set: bool) -> &'static str {
    if set {
        "Set"
    } else {
        "Not set"
    }
}

#[component]
pub fn AuthDebug() -> Element {
    let services = use_services();
    let auth = use_auth();

    let connection = {
        let services = services.clone();
        use_resource(move || {
            let services = services.clone();
            async move { probe(&*services.auth, &*services.profiles).await }
        })
    };

    let mut report = Diagnostics::collect(&services.backend_config, &auth());
    if let Some(status) = connection() {
        report = report.with_connection(status);
    }
    let connection_line = match &report.connection {
        None => "Testing...".to_string(),
        Some(status @ (ConnectionStatus::Ok | ConnectionStatus::RlsBlocking)) => format!("OK: {status}"),
        Some(status) => format!("FAILED: {status}"),
    };
    let user = report.user.clone().unwrap_or_else(|| "None".to_string());
    let url_set = yes_no(report.config.url_set);
    let key_set = yes_no(report.config.key_set);
    let init_timeout_ms = services.config.session.init_timeout_ms;

    rsx! {
        div {
            class: "p-4 border rounded bg-neutral-50 text-sm font-mono",
            h3 { class: "mb-2 font-bold", "Auth Debug" }
            div { "Loading: {report.loading}" }
            div { "User: {user}" }
            div { "Profile: {report.profile}" }
            div { "Supabase URL: {url_set}" }
            div { "Supabase Key: {key_set}" }
            div { "Connection: {connection_line}" }
            if report.loading {
                div {
                    class: "mt-2 text-neutral-500",
                    "This should complete within {init_timeout_ms} ms."
                }
            }
        }
    }
}
