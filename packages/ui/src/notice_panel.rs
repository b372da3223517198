use api::NoticeLevel;
use dioxus::prelude::*;

use crate::notices::use_notices;

const NOTICES_CSS: Asset = asset!("/assets/styling/notices.css");

#[component]
pub fn NoticePanel() -> Element {
    let mut log = use_notices();

    if !log().visible {
        return rsx! {};
    }

    let entries = log().entries.clone();

    rsx! {
        document::Stylesheet { href: NOTICES_CSS }

        div {
            class: "notice-panel",
            div {
                class: "notice-header",
                span { "Notifications" }
                div {
                    class: "notice-header-actions",
                    button {
                        onclick: move |_| log.write().entries.clear(),
                        "Clear"
                    }
                    button {
                        onclick: move |_| log.write().visible = false,
                        "Close"
                    }
                }
            }
            div {
                class: "notice-entries",
                for entry in entries.iter().rev() {
                    div {
                        class: match entry.notice.level {
                            NoticeLevel::Error => "notice-entry error",
                            NoticeLevel::Warning => "notice-entry warning",
                            NoticeLevel::Success => "notice-entry success",
                            NoticeLevel::Info => "notice-entry info",
                        },
                        span { class: "notice-time", "{entry.timestamp}" }
                        strong { " {entry.notice.title}" }
                        p { "{entry.notice.description}" }
                    }
                }
            }
        }
    }
}

#[component]
pub fn NoticeToggle() -> Element {
    let mut log = use_notices();
    let count = log().entries.len();
    let has_errors = log().has_errors();

    rsx! {
        button {
            class: if has_errors { "notice-toggle has-errors" } else { "notice-toggle" },
            onclick: move |_| {
                let visible = log().visible;
                log.write().visible = !visible;
            },
            title: "Notifications",
            if count > 0 {
                "{count}"
            } else {
                "Log"
            }
        }
    }
}
