//! Connection probe and session summary for the debug view.

use std::fmt;

use store::{AuthBackend, BackendError, ProfileStore};

use crate::config::{BackendConfig, ConfigDiagnostics};
use crate::session::{ProfileLookup, SessionState};

/// Any id works for the probe; the query only has to reach the table.
const PROBE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Ok,
    /// Reachable, but row-level security rejects reads of `profiles`.
    RlsBlocking,
    AuthError(String),
    ProfilesError(String),
}

impl ConnectionStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Ok | Self::RlsBlocking)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "Connection OK"),
            Self::RlsBlocking => write!(f, "Connection OK (RLS blocking profiles)"),
            Self::AuthError(msg) => write!(f, "Auth Error: {msg}"),
            Self::ProfilesError(msg) => write!(f, "Profiles Error: {msg}"),
        }
    }
}

/// Check that the auth endpoint answers and the `profiles` table is readable.
pub async fn probe(auth: &dyn AuthBackend, profiles: &dyn ProfileStore) -> ConnectionStatus {
    if let Err(e) = auth.get_session().await {
        tracing::warn!("diagnostics: auth probe failed: {}", e);
        return ConnectionStatus::AuthError(e.to_string());
    }
    match profiles.select_profile_by_id(PROBE_ID).await {
        Ok(_) | Err(BackendError::NotFound) => ConnectionStatus::Ok,
        Err(BackendError::PermissionDenied(_) | BackendError::Unauthorized(_)) => {
            ConnectionStatus::RlsBlocking
        }
        Err(e) => {
            tracing::warn!("diagnostics: profiles probe failed: {}", e);
            ConnectionStatus::ProfilesError(e.to_string())
        }
    }
}

/// Everything the debug view shows.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub config: ConfigDiagnostics,
    pub loading: bool,
    pub user: Option<String>,
    pub profile: String,
    pub connection: Option<ConnectionStatus>,
}

impl Diagnostics {
    pub fn collect(config: &BackendConfig, state: &SessionState) -> Self {
        let profile = match (&state.profile, &state.lookup) {
            (Some(profile), _) => format!("Loaded ({})", profile.display_name()),
            (None, ProfileLookup::Idle) => "None".to_string(),
            (None, ProfileLookup::Missing) => "Missing".to_string(),
            (None, ProfileLookup::Failed(reason)) => format!("Unavailable: {reason}"),
            (None, ProfileLookup::Found) => "None".to_string(),
        };
        Self {
            config: config.diagnostics(),
            loading: state.loading,
            user: state.identity.as_ref().map(|i| i.email.clone()),
            profile,
            connection: None,
        }
    }

    pub fn with_connection(mut self, status: ConnectionStatus) -> Self {
        self.connection = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{Identity, MemoryBackend};

    #[tokio::test]
    async fn test_probe_reports_ok_on_empty_table() {
        let backend = MemoryBackend::new();
        let status = probe(&backend, &backend).await;
        assert_eq!(status, ConnectionStatus::Ok);
        assert_eq!(status.to_string(), "Connection OK");
    }

    #[tokio::test]
    async fn test_probe_recognizes_row_level_security() {
        let backend = MemoryBackend::new();
        backend.fail_selects_with(Some(BackendError::PermissionDenied(
            "permission denied for table profiles".into(),
        )));
        let status = probe(&backend, &backend).await;
        assert_eq!(status, ConnectionStatus::RlsBlocking);
        assert!(status.is_reachable());
    }

    #[tokio::test]
    async fn test_probe_reports_other_profile_errors() {
        let backend = MemoryBackend::new();
        backend.fail_selects_with(Some(BackendError::Backend {
            status: 404,
            code: "42P01".into(),
            message: "relation \"public.profiles\" does not exist".into(),
        }));
        let status = probe(&backend, &backend).await;
        assert!(matches!(status, ConnectionStatus::ProfilesError(_)));
        assert!(!status.is_reachable());
    }

    #[test]
    fn collect_summarizes_session() {
        let config = BackendConfig::from_values(Some("https://x.supabase.co".into()), None);
        let state = SessionState {
            identity: Some(Identity::new("u1", "ada@campus.edu")),
            profile: None,
            lookup: ProfileLookup::Missing,
            loading: false,
        };
        let diag = Diagnostics::collect(&config, &state).with_connection(ConnectionStatus::Ok);
        assert!(diag.config.url_set);
        assert!(!diag.config.key_set);
        assert_eq!(diag.user.as_deref(), Some("ada@campus.edu"));
        assert_eq!(diag.profile, "Missing");
        assert_eq!(diag.connection, Some(ConnectionStatus::Ok));
    }
}
