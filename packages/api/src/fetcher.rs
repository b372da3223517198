//! Profile lookup with outcome classification.

use std::sync::Arc;

use store::{BackendError, Profile, ProfileStore};

/// Result of looking up the profile for an identity.
///
/// `NotFound` is the normal state of a freshly registered user and the only
/// outcome that may lead to profile creation. `TransientError` covers
/// permission denials and everything else the backend can throw; acting on
/// it could create duplicate or unauthorized rows.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    Found(Profile),
    NotFound,
    TransientError(BackendError),
}

impl FetchOutcome {
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Found(profile) => Some(profile),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ProfileFetcher {
    store: Arc<dyn ProfileStore>,
}

impl ProfileFetcher {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Look up the profile keyed by `identity_id`. Pure read.
    pub async fn fetch(&self, identity_id: &str) -> FetchOutcome {
        match self.store.select_profile_by_id(identity_id).await {
            Ok(Some(profile)) => FetchOutcome::Found(profile),
            Ok(None) | Err(BackendError::NotFound) => {
                tracing::debug!(user = identity_id, "profile does not exist yet");
                FetchOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!(user = identity_id, "profile fetch failed: {}", e);
                FetchOutcome::TransientError(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{Identity, MemoryBackend, NewProfile};
    use chrono::Utc;

    #[tokio::test]
    async fn test_missing_row_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let fetcher = ProfileFetcher::new(backend.clone());
        assert_eq!(fetcher.fetch("nobody").await, FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_existing_row_is_found() {
        let backend = Arc::new(MemoryBackend::new());
        let identity = Identity::new("u1", "u1@campus.edu");
        backend.put_profile(NewProfile::from_identity(&identity).into_profile(Utc::now()));

        let fetcher = ProfileFetcher::new(backend.clone());
        let outcome = fetcher.fetch("u1").await;
        assert_eq!(outcome.profile().map(|p| p.id.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn test_permission_denied_is_transient() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_selects_with(Some(BackendError::PermissionDenied(
            "new row violates row-level security policy".into(),
        )));
        let fetcher = ProfileFetcher::new(backend.clone());
        assert!(matches!(
            fetcher.fetch("u1").await,
            FetchOutcome::TransientError(BackendError::PermissionDenied(_))
        ));
    }
}
