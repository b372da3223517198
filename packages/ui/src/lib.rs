//! This crate contains all shared UI for the workspace.

pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

mod services;
pub use services::Services;

mod auth;
pub use auth::{use_auth, use_services, AuthProvider, LogoutButton};

mod profile_handler;
pub use profile_handler::ProfileCreationHandler;

mod auth_debug;
pub use auth_debug::AuthDebug;

pub mod notices;
pub use notices::{push_notice, use_notices, NoticeLog};

mod notice_panel;
pub use notice_panel::{NoticePanel, NoticeToggle};
