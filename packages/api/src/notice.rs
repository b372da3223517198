//! User-visible messages.
//!
//! Nothing in this crate hands raw backend errors to the presentation layer;
//! operations resolve to a state plus, when the user should know, a [`Notice`].

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Automatic profile creation failed; the setup form is the way forward.
    pub fn profile_setup_required() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Profile Setup Required",
            "Please complete your profile setup to continue.",
        )
    }

    /// A backend read or write was rejected; trying again later may work.
    pub fn retryable(description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, "Temporarily Unavailable", description)
    }
}
