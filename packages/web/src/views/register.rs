//! Registration page view with email/password form and academic details.

use api::registration::register;
use api::{Registered, RegistrationForm};
use dioxus::prelude::*;
use store::models::ACADEMIC_YEARS;
use ui::{push_notice, use_notices, use_services};

use super::{go_to, NavBar};
use crate::Route;

/// Register page component.
#[component]
pub fn Register() -> Element {
    let services = use_services();
    let mut notices = use_notices();
    let mut first_name = use_signal(String::new);
    let mut last_name = use_signal(String::new);
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut confirm_password = use_signal(String::new);
    let mut student_id = use_signal(String::new);
    let mut major = use_signal(String::new);
    let mut year = use_signal(String::new);
    let mut loading = use_signal(|| false);

    let handle_register = move |evt: FormEvent| {
        evt.prevent_default();
        let services = services.clone();
        spawn(async move {
            let form = RegistrationForm {
                first_name: first_name(),
                last_name: last_name(),
                email: email(),
                password: password(),
                confirm_password: confirm_password(),
                student_id: student_id(),
                major: major(),
                year: year(),
            };

            loading.set(true);
            match register(&*services.auth, &form).await {
                Ok(registered) => {
                    push_notice(&mut notices, registered.notice());
                    match registered {
                        Registered::SignedIn(session) => {
                            if let Some(sync) = services.sync() {
                                if let Err(e) = sync.push(Some(&session)).await {
                                    tracing::warn!("session sync after signup failed: {}", e);
                                }
                            }
                            go_to("/");
                        }
                        Registered::ConfirmationRequired(_) => go_to("/auth/login"),
                    }
                }
                Err(e) => {
                    loading.set(false);
                    push_notice(&mut notices, e.notice());
                }
            }
        });
    };

    rsx! {
        NavBar {}
        div {
            class: "page",
            h1 { "Create Account" }

            form {
                class: "form",
                onsubmit: handle_register,

                input {
                    r#type: "text",
                    placeholder: "First name",
                    value: first_name(),
                    oninput: move |evt: FormEvent| first_name.set(evt.value()),
                }
                input {
                    r#type: "text",
                    placeholder: "Last name",
                    value: last_name(),
                    oninput: move |evt: FormEvent| last_name.set(evt.value()),
                }
                input {
                    r#type: "email",
                    placeholder: "Email",
                    value: email(),
                    oninput: move |evt: FormEvent| email.set(evt.value()),
                }
                input {
                    r#type: "password",
                    placeholder: "Password (min 6 characters)",
                    value: password(),
                    oninput: move |evt: FormEvent| password.set(evt.value()),
                }
                input {
                    r#type: "password",
                    placeholder: "Confirm password",
                    value: confirm_password(),
                    oninput: move |evt: FormEvent| confirm_password.set(evt.value()),
                }
                input {
                    r#type: "text",
                    placeholder: "Student ID (optional)",
                    value: student_id(),
                    oninput: move |evt: FormEvent| student_id.set(evt.value()),
                }
                input {
                    r#type: "text",
                    placeholder: "Major (optional)",
                    value: major(),
                    oninput: move |evt: FormEvent| major.set(evt.value()),
                }
                select {
                    value: year(),
                    onchange: move |evt: FormEvent| year.set(evt.value()),
                    option { value: "", "Academic year (optional)" }
                    for y in ACADEMIC_YEARS {
                        option { key: "{y}", value: "{y}", "{y}" }
                    }
                }
                button {
                    class: "btn",
                    r#type: "submit",
                    disabled: loading(),
                    if loading() { "Creating account..." } else { "Sign up" }
                }
            }

            p {
                class: "muted",
                "Already have an account? "
                Link { to: Route::Login {}, "Sign in" }
            }
        }
    }
}
