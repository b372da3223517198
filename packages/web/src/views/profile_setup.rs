//! Profile setup view: the academic details a fresh account is missing.

use api::setup::complete_profile_setup;
use api::ProfileSetupForm;
use dioxus::prelude::*;
use store::models::ACADEMIC_YEARS;
use ui::{push_notice, use_auth, use_notices, use_services};

use super::{go_to, NavBar};

#[component]
pub fn ProfileSetup() -> Element {
    let auth = use_auth();
    let services = use_services();
    let mut notices = use_notices();
    let mut student_id = use_signal(String::new);
    let mut major = use_signal(String::new);
    let mut year = use_signal(String::new);
    let mut bio = use_signal(String::new);
    let mut saving = use_signal(|| false);
    let mut prefilled = use_signal(|| false);

    // Fill the form once the session has resolved.
    use_effect(move || {
        let state = auth();
        if state.loading || *prefilled.peek() {
            return;
        }
        let form = ProfileSetupForm::prefilled(&state);
        student_id.set(form.student_id);
        major.set(form.major);
        year.set(form.year);
        bio.set(form.bio);
        prefilled.set(true);
    });

    let handle_save = move |evt: FormEvent| {
        evt.prevent_default();
        let services = services.clone();
        spawn(async move {
            let form = ProfileSetupForm {
                student_id: student_id(),
                major: major(),
                year: year(),
                bio: bio(),
            };
            saving.set(true);
            match complete_profile_setup(&*services.profiles, &services.session, &form).await {
                Ok(profile) => {
                    tracing::info!(user = %profile.id, complete = profile.is_complete(), "profile saved");
                    go_to("/");
                }
                Err(e) => {
                    saving.set(false);
                    push_notice(&mut notices, e.notice());
                }
            }
        });
    };

    rsx! {
        NavBar {}
        div {
            class: "page",
            h1 { "Set Up Your Profile" }
            p { class: "muted", "Tell your classmates a little about yourself." }

            form {
                class: "form",
                onsubmit: handle_save,

                input {
                    r#type: "text",
                    placeholder: "Student ID",
                    value: student_id(),
                    oninput: move |evt: FormEvent| student_id.set(evt.value()),
                }
                input {
                    r#type: "text",
                    placeholder: "Major",
                    value: major(),
                    oninput: move |evt: FormEvent| major.set(evt.value()),
                }
                select {
                    value: year(),
                    onchange: move |evt: FormEvent| year.set(evt.value()),
                    option { value: "", "Academic year" }
                    for y in ACADEMIC_YEARS {
                        option { key: "{y}", value: "{y}", "{y}" }
                    }
                }
                textarea {
                    placeholder: "Bio",
                    value: bio(),
                    oninput: move |evt: FormEvent| bio.set(evt.value()),
                }
                button {
                    class: "btn",
                    r#type: "submit",
                    disabled: saving(),
                    if saving() { "Saving..." } else { "Save profile" }
                }
            }
        }
    }
}
