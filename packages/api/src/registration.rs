//! Signup and password sign-in.
//!
//! Registration only creates the identity. The profile row is created later,
//! by a backend trigger or by the reconciler, from the metadata sent here.

use thiserror::Error;

use store::models::non_blank;
use store::{AuthBackend, AuthSession, BackendError, Identity, SignupMetadata};

use crate::notice::{Notice, NoticeLevel};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least 6 characters")]
    PasswordTooShort,
    #[error("'{0}' is not an email address")]
    InvalidEmail(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl RegistrationError {
    pub fn notice(&self) -> Notice {
        match self {
            Self::PasswordMismatch => Notice::new(
                NoticeLevel::Error,
                "Password Mismatch",
                "Passwords do not match. Please try again.",
            ),
            Self::PasswordTooShort => Notice::new(
                NoticeLevel::Error,
                "Password Too Short",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters long."),
            ),
            Self::InvalidEmail(_) => Notice::new(
                NoticeLevel::Error,
                "Invalid Email",
                "Please enter a valid email address.",
            ),
            Self::Backend(e) => Notice::new(NoticeLevel::Error, "Registration Failed", e.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub student_id: String,
    pub major: String,
    pub year: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.password != self.confirm_password {
            return Err(RegistrationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }
        let email = self.email.trim();
        if !email.contains('@') {
            return Err(RegistrationError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }

    /// Signup metadata stored with the identity; blank fields are omitted.
    pub fn metadata(&self) -> SignupMetadata {
        SignupMetadata {
            first_name: non_blank(Some(&self.first_name)),
            last_name: non_blank(Some(&self.last_name)),
            student_id: non_blank(Some(&self.student_id)),
            major: non_blank(Some(&self.major)),
            year: non_blank(Some(&self.year)),
        }
    }
}

/// What the user should see after a successful signup.
#[derive(Clone, Debug, PartialEq)]
pub enum Registered {
    /// The backend signed the user in straight away.
    SignedIn(AuthSession),
    /// The account exists but the email has to be confirmed first.
    ConfirmationRequired(Identity),
}

impl Registered {
    pub fn notice(&self) -> Notice {
        match self {
            Self::SignedIn(_) => Notice::new(
                NoticeLevel::Success,
                "Registration Successful!",
                "Your account has been created successfully.",
            ),
            Self::ConfirmationRequired(_) => Notice::new(
                NoticeLevel::Success,
                "Registration Successful!",
                "Your account has been created successfully. Please check your email to verify your account.",
            ),
        }
    }
}

pub async fn register(
    auth: &dyn AuthBackend,
    form: &RegistrationForm,
) -> Result<Registered, RegistrationError> {
    form.validate()?;
    let email = form.email.trim();
    let outcome = auth.sign_up(email, &form.password, &form.metadata()).await?;
    tracing::info!(user = %outcome.identity.id, confirmed = outcome.session.is_some(), "account registered");
    Ok(match outcome.session {
        Some(session) => Registered::SignedIn(session),
        None => Registered::ConfirmationRequired(outcome.identity),
    })
}

/// Password sign-in. The backend announces the new session on its event
/// stream, which is how the session store learns about it.
pub async fn sign_in(
    auth: &dyn AuthBackend,
    email: &str,
    password: &str,
) -> Result<AuthSession, BackendError> {
    let session = auth.sign_in_with_password(email.trim(), password).await?;
    tracing::info!(user = %session.user.id, "signed in");
    Ok(session)
}

pub fn sign_in_failed(error: &BackendError) -> Notice {
    Notice::new(NoticeLevel::Error, "Sign In Failed", error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{AuthEventKind, MemoryBackend};

    fn form() -> RegistrationForm {
        RegistrationForm {
            first_name: "Alan".into(),
            last_name: "Turing".into(),
            email: "alan@campus.edu".into(),
            password: "enigma".into(),
            confirm_password: "enigma".into(),
            student_id: "S-1912".into(),
            major: "".into(),
            year: "graduate".into(),
        }
    }

    #[test]
    fn validate_checks_passwords_then_email() {
        assert!(form().validate().is_ok());

        let mismatch = RegistrationForm {
            confirm_password: "bombe".into(),
            ..form()
        };
        assert!(matches!(mismatch.validate(), Err(RegistrationError::PasswordMismatch)));
        assert_eq!(mismatch.validate().unwrap_err().notice().title, "Password Mismatch");

        let short = RegistrationForm {
            password: "abc".into(),
            confirm_password: "abc".into(),
            ..form()
        };
        assert_eq!(short.validate().unwrap_err().notice().title, "Password Too Short");

        let email = RegistrationForm {
            email: "alan".into(),
            ..form()
        };
        assert!(matches!(email.validate(), Err(RegistrationError::InvalidEmail(_))));
    }

    #[test]
    fn metadata_drops_blank_fields() {
        let meta = form().metadata();
        assert_eq!(meta.first_name.as_deref(), Some("Alan"));
        assert_eq!(meta.major, None);
        assert_eq!(meta.year.as_deref(), Some("graduate"));
    }

    #[tokio::test]
    async fn test_register_signs_in_and_stores_metadata() {
        let backend = MemoryBackend::new();
        let mut events = backend.subscribe();

        let registered = register(&backend, &form()).await.unwrap();
        let Registered::SignedIn(session) = registered else {
            panic!("expected a session");
        };
        assert_eq!(session.user.metadata.student_id.as_deref(), Some("S-1912"));
        assert_eq!(events.recv().await.unwrap().kind, AuthEventKind::SignedIn);
        // Registration never writes the profile itself.
        assert_eq!(backend.profile_count(), 0);
    }

    #[tokio::test]
    async fn test_register_with_email_confirmation() {
        let backend = MemoryBackend::new();
        backend.require_email_confirmation(true);

        let registered = register(&backend, &form()).await.unwrap();
        assert!(matches!(registered, Registered::ConfirmationRequired(_)));
        assert!(registered.notice().description.contains("check your email"));
        assert!(backend.held_session().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_reported() {
        let backend = MemoryBackend::new();
        register(&backend, &form()).await.unwrap();
        let err = register(&backend, &form()).await.unwrap_err();
        assert_eq!(err.notice().title, "Registration Failed");
    }

    #[tokio::test]
    async fn test_sign_in_trims_email() {
        let backend = MemoryBackend::new();
        register(&backend, &form()).await.unwrap();
        backend.sign_out().await.unwrap();

        let session = sign_in(&backend, "  alan@campus.edu ", "enigma").await.unwrap();
        assert_eq!(session.user.email, "alan@campus.edu");

        let err = sign_in(&backend, "alan@campus.edu", "wrong").await.unwrap_err();
        assert_eq!(sign_in_failed(&err).title, "Sign In Failed");
    }
}
