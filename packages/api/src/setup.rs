//! Profile setup form: fills in the academic fields of the signed-in user's
//! profile, creating the row first if reconciliation has not done so yet.

use thiserror::Error;

use store::models::{non_blank, ACADEMIC_YEARS};
use store::{BackendError, NewProfile, Profile, ProfileStore};

use crate::notice::{Notice, NoticeLevel};
use crate::session::{SessionState, SessionStore};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("unknown academic year '{0}'")]
    InvalidYear(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SetupError {
    pub fn notice(&self) -> Notice {
        match self {
            Self::NotSignedIn => Notice::new(
                NoticeLevel::Warning,
                "Not Signed In",
                "Please sign in to set up your profile.",
            ),
            Self::InvalidYear(_) => Notice::new(
                NoticeLevel::Error,
                "Invalid Year",
                format!("Choose one of: {}.", ACADEMIC_YEARS.join(", ")),
            ),
            Self::Backend(e) => Notice::new(NoticeLevel::Error, "Profile Update Failed", e.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileSetupForm {
    pub student_id: String,
    pub major: String,
    pub year: String,
    pub bio: String,
}

impl ProfileSetupForm {
    /// Start from the loaded profile, or from signup metadata when there is
    /// no row yet.
    pub fn prefilled(state: &SessionState) -> Self {
        if let Some(profile) = &state.profile {
            return Self {
                student_id: profile.student_id.clone().unwrap_or_default(),
                major: profile.major.clone().unwrap_or_default(),
                year: profile.year.clone().unwrap_or_default(),
                bio: profile.bio.clone().unwrap_or_default(),
            };
        }
        let Some(identity) = &state.identity else {
            return Self::default();
        };
        let meta = &identity.metadata;
        Self {
            student_id: meta.student_id.clone().unwrap_or_default(),
            major: meta.major.clone().unwrap_or_default(),
            year: meta.year.clone().unwrap_or_default(),
            bio: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        let year = self.year.trim();
        if !year.is_empty() && !ACADEMIC_YEARS.contains(&year) {
            return Err(SetupError::InvalidYear(year.to_string()));
        }
        Ok(())
    }
}

/// Save the setup form for the signed-in user and refresh the session.
///
/// The row is inserted first if it does not exist (a conflict means someone
/// else just created it, and that row is read back), then upserted on `id`
/// with the form values. Names and role already stored are kept.
pub async fn complete_profile_setup(
    profiles: &dyn ProfileStore,
    session: &SessionStore,
    form: &ProfileSetupForm,
) -> Result<Profile, SetupError> {
    form.validate()?;
    let state = session.snapshot();
    let identity = state.identity.ok_or(SetupError::NotSignedIn)?;

    let existing = match state.profile {
        Some(profile) => Some(profile),
        None => profiles.select_profile_by_id(&identity.id).await?,
    };

    let existing = match existing {
        Some(profile) => profile,
        None => match profiles.insert_profile(&NewProfile::from_identity(&identity)).await {
            Ok(profile) => profile,
            Err(BackendError::Conflict) => {
                tracing::debug!(user = %identity.id, "profile appeared during setup");
                // Merge from the row that won, never from signup metadata.
                profiles
                    .select_profile_by_id(&identity.id)
                    .await?
                    .ok_or(BackendError::Conflict)?
            }
            Err(e) => return Err(e.into()),
        },
    };

    let mut record = NewProfile::from_identity(&identity);
    if !existing.first_name.trim().is_empty() {
        record.first_name = existing.first_name.clone();
    }
    if !existing.last_name.trim().is_empty() {
        record.last_name = existing.last_name.clone();
    }
    record.role = existing.role;
    record.student_id = non_blank(Some(&form.student_id));
    record.major = non_blank(Some(&form.major));
    record.year = non_blank(Some(&form.year));
    record.bio = non_blank(Some(&form.bio));

    let saved = profiles.upsert_profile(&record).await?;
    tracing::info!(user = %identity.id, complete = saved.is_complete(), "profile setup saved");
    session.refresh_profile().await;
    Ok(saved)
}
