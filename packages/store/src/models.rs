//! # Domain models for identities, profiles and auth sessions
//!
//! These types mirror the JSON shapes of a Supabase-compatible backend so they
//! can be deserialized straight from GoTrue (`/auth/v1`) and PostgREST
//! (`/rest/v1/profiles`) responses, and are `Clone + PartialEq` so the UI can
//! keep them in signals.
//!
//! | Type | Represents |
//! |------|-----------|
//! | [`Identity`] | The authenticated user handle issued by the auth backend, with its signup metadata. |
//! | [`Profile`] | The application-owned row in `profiles`, keyed 1:1 by `Identity::id`. |
//! | [`NewProfile`] | The insert/upsert payload for `profiles` (no timestamps; the backend fills them). |
//! | [`AuthSession`] | An access/refresh token pair plus the user it belongs to. |
//! | [`AuthEvent`] | One item of the backend's auth state stream. |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Academic years accepted by the registration and profile setup forms.
pub const ACADEMIC_YEARS: [&str; 5] = ["freshman", "sophomore", "junior", "senior", "graduate"];

/// Metadata captured at signup and stored by the auth backend as `user_metadata`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignupMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// Authenticated user handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "user_metadata", default)]
    pub metadata: SignupMetadata,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            metadata: SignupMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: SignupMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// "First Last" from signup metadata, falling back to the email.
    pub fn display_name(&self) -> String {
        let first = self.metadata.first_name.as_deref().unwrap_or("").trim();
        let last = self.metadata.last_name.as_deref().unwrap_or("").trim();
        match (first.is_empty(), last.is_empty()) {
            (true, true) => self.email.clone(),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (false, false) => format!("{first} {last}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Tutor,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Student => "student",
            Self::Tutor => "tutor",
            Self::Admin => "admin",
        })
    }
}

/// A row of the `profiles` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Get display name, falling back to email if both names are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }

    /// A profile is complete once student id, major and year are all filled in.
    pub fn is_complete(&self) -> bool {
        [&self.student_id, &self.major, &self.year]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Insert/upsert payload for `profiles`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub student_id: Option<String>,
    pub major: Option<String>,
    pub year: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
}

impl NewProfile {
    /// Build the record the reconciler inserts: names and academic fields
    /// copied from signup metadata, role `student`.
    pub fn from_identity(identity: &Identity) -> Self {
        let meta = &identity.metadata;
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            first_name: meta.first_name.clone().unwrap_or_default(),
            last_name: meta.last_name.clone().unwrap_or_default(),
            student_id: non_blank(meta.student_id.as_deref()),
            major: non_blank(meta.major.as_deref()),
            year: non_blank(meta.year.as_deref()),
            bio: None,
            role: Role::Student,
        }
    }

    /// Materialize the row the backend would store for this payload.
    pub fn into_profile(self, now: DateTime<Utc>) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            student_id: self.student_id,
            major: self.major,
            year: self.year,
            bio: self.bio,
            avatar_url: None,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trim a form or metadata value, mapping blank input to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Token pair issued by the auth backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds; derived from `expires_in` when the backend omits it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: Identity,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    /// Fill in `expires_at` from `expires_in` relative to `now`.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some(now.timestamp() + self.expires_in);
        }
        self
    }

    /// Expired, with a small margin so a token is not used in its last seconds.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        const MARGIN_SECS: i64 = 10;
        self.expires_at
            .is_some_and(|at| now.timestamp() + MARGIN_SECS >= at)
    }
}

/// Result of a signup: the session is absent when the backend requires email
/// confirmation first.
#[derive(Clone, Debug, PartialEq)]
pub struct SignUpOutcome {
    pub identity: Identity,
    pub session: Option<AuthSession>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One item of the auth backend's state stream.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<AuthSession>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<AuthSession>) -> Self {
        Self { kind, session }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.user)
    }
}
