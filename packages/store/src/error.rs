//! Error taxonomy shared by every backend implementation.

use thiserror::Error;

/// GoTrue error codes meaning the presented session can no longer be used.
pub const SESSION_REJECTED: [&str; 5] = [
    "invalid_grant",
    "refresh_token_not_found",
    "refresh_token_already_used",
    "session_not_found",
    "bad_jwt",
];

/// Classified failure of an auth or data backend call.
///
/// Callers branch on the variant, never on the message: `NotFound` and
/// `Conflict` are expected outcomes, `Unauthorized` means the tokens are no
/// longer usable, and everything else is transient from the caller's view.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not authenticated: {0}")]
    Unauthorized(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("backend error {status} ({code}): {message}")]
    Backend {
        status: u16,
        code: String,
        message: String,
    },
    #[error("invalid response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Another writer already created the record.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// The session or token was rejected; the user should be treated as signed out.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Classify a PostgREST/GoTrue error body.
    ///
    /// PostgREST reports `PGRST116` for "no rows", `PGRST301`/`PGRST303` for JWT
    /// problems, SQLSTATE `42501` for row-level-security denials and `23505`
    /// for unique violations. GoTrue answers a dead refresh token or session
    /// with 400 and one of [`SESSION_REJECTED`].
    pub fn classify(status: u16, code: &str, message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        match (status, code) {
            (_, "23505") | (409, _) => Self::Conflict,
            (_, "PGRST116") if lowered.contains("0 rows") || lowered.contains("no rows") => {
                Self::NotFound
            }
            (_, "PGRST301") | (_, "PGRST302") | (_, "PGRST303") | (401, _) => {
                Self::Unauthorized(message.to_string())
            }
            (_, code) if SESSION_REJECTED.contains(&code) => Self::Unauthorized(message.to_string()),
            _ if lowered.contains("jwt") => Self::Unauthorized(message.to_string()),
            (_, "42501") | (403, _) => Self::PermissionDenied(message.to_string()),
            _ if lowered.contains("permission denied") => {
                Self::PermissionDenied(message.to_string())
            }
            _ => Self::Backend {
                status,
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_postgrest_codes() {
        assert_eq!(
            BackendError::classify(409, "23505", "duplicate key value violates unique constraint"),
            BackendError::Conflict
        );
        assert_eq!(
            BackendError::classify(406, "PGRST116", "JSON object requested, multiple (or no) rows returned; The result contains 0 rows"),
            BackendError::NotFound
        );
        assert!(BackendError::classify(401, "PGRST301", "JWT expired").is_auth());
        assert!(matches!(
            BackendError::classify(403, "42501", "permission denied for table profiles"),
            BackendError::PermissionDenied(_)
        ));
        assert!(matches!(
            BackendError::classify(404, "42P01", "relation \"public.profiles\" does not exist"),
            BackendError::Backend { status: 404, .. }
        ));
    }

    #[test]
    fn dead_refresh_tokens_mean_signed_out() {
        for code in SESSION_REJECTED {
            let error = BackendError::classify(400, code, "Invalid Refresh Token: Refresh Token Not Found");
            assert!(error.is_auth(), "{code} should sign the user out");
        }
        assert!(matches!(
            BackendError::classify(400, "invalid_credentials", "Invalid login credentials"),
            BackendError::Backend { status: 400, .. }
        ));
    }
}
