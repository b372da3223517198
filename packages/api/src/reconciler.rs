//! # Profile reconciler
//!
//! Makes sure every signed-in identity ends up with exactly one profile row.
//! The backend may create the row itself (a signup trigger), the profile setup
//! form may create it, and several reconciler runs may overlap; none of this is
//! coordinated on the client. Duplicates are prevented by the unique key on
//! `profiles.id`: a losing insert comes back as [`BackendError::Conflict`] and
//! is treated as success, because the row exists either way.
//!
//! The settle delay before the re-check gives a backend trigger time to finish
//! first. It only makes conflicts rarer; it is not what guarantees uniqueness,
//! and a zero delay is a valid setting.

use std::sync::Arc;
use std::time::Duration;

use store::time;
use store::{BackendError, Identity, NewProfile, Profile, ProfileStore};

use crate::fetcher::{FetchOutcome, ProfileFetcher};
use crate::notice::Notice;
use crate::session::SessionStore;

#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileOutcome {
    /// Not signed in, profile already loaded, or the last lookup did not
    /// establish that the row is missing.
    Skipped,
    /// The re-check found a row created by someone else.
    AlreadyExists,
    Created(Profile),
    /// Our insert lost a race; the row exists.
    Conflict,
    /// The re-check failed, so nothing was written.
    Deferred(Notice),
    /// The insert failed for a reason other than a conflict.
    Failed(Notice),
}

impl ReconcileOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Deferred(notice) | Self::Failed(notice) => Some(notice),
            _ => None,
        }
    }

    /// Whether a profile row is known to exist afterwards.
    pub fn profile_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists | Self::Created(_) | Self::Conflict)
    }
}

pub struct ProfileReconciler {
    profiles: Arc<dyn ProfileStore>,
    fetcher: ProfileFetcher,
    settle_delay: Duration,
}

impl ProfileReconciler {
    pub fn new(profiles: Arc<dyn ProfileStore>, settle_delay: Duration) -> Self {
        Self {
            fetcher: ProfileFetcher::new(profiles.clone()),
            profiles,
            settle_delay,
        }
    }

    /// Run once for the current session: if the session holds an identity
    /// whose profile is confirmed missing, wait the settle delay, create the
    /// row if still absent, and refresh the session.
    pub async fn reconcile(&self, session: &SessionStore) -> ReconcileOutcome {
        let snapshot = session.snapshot();
        let Some(identity) = snapshot.identity.clone().filter(|_| snapshot.needs_profile()) else {
            return ReconcileOutcome::Skipped;
        };

        if !self.settle_delay.is_zero() {
            time::sleep(self.settle_delay).await;
        }

        // The user may have signed out or switched accounts while we waited.
        let current = session.snapshot();
        let same_user = current.identity.as_ref().is_some_and(|i| i.id == identity.id);
        if !same_user || current.profile.is_some() {
            return ReconcileOutcome::Skipped;
        }

        let outcome = self.ensure_profile(&identity).await;
        if outcome.profile_exists() {
            session.refresh_profile().await;
        }
        outcome
    }

    /// Re-check, then insert the profile for `identity` unless it exists.
    /// Safe to run concurrently for the same identity.
    pub async fn ensure_profile(&self, identity: &Identity) -> ReconcileOutcome {
        match self.fetcher.fetch(&identity.id).await {
            FetchOutcome::Found(_) => {
                tracing::debug!(user = %identity.id, "profile already exists, skipping creation");
                return ReconcileOutcome::AlreadyExists;
            }
            FetchOutcome::TransientError(e) => {
                return ReconcileOutcome::Deferred(Notice::retryable(format!(
                    "Could not check your profile ({e}). Please try again shortly."
                )));
            }
            FetchOutcome::NotFound => {}
        }

        let record = NewProfile::from_identity(identity);
        match self.profiles.insert_profile(&record).await {
            Ok(profile) => {
                tracing::info!(user = %identity.id, "profile created");
                ReconcileOutcome::Created(profile)
            }
            Err(BackendError::Conflict) => {
                tracing::debug!(user = %identity.id, "profile created concurrently elsewhere");
                ReconcileOutcome::Conflict
            }
            Err(e) => {
                tracing::error!(user = %identity.id, "profile creation failed: {}", e);
                ReconcileOutcome::Failed(Notice::profile_setup_required())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use store::config::SessionConfig;
    use store::{AuthBackend, MemoryBackend, Role, SignupMetadata};

    use crate::session::ProfileLookup;

    fn metadata() -> SignupMetadata {
        SignupMetadata {
            first_name: Some("Katherine".into()),
            last_name: Some("Johnson".into()),
            student_id: Some("S-1918".into()),
            major: Some("Mathematics".into()),
            year: Some("senior".into()),
        }
    }

    async fn signed_in_store(backend: &Arc<MemoryBackend>) -> (SessionStore, Identity) {
        let identity = backend.seed_account("kj@campus.edu", "orbits", metadata());
        backend
            .sign_in_with_password("kj@campus.edu", "orbits")
            .await
            .unwrap();
        let store = SessionStore::new(backend.clone(), backend.clone(), SessionConfig::default());
        store.initialize().await;
        (store, identity)
    }

    #[tokio::test(start_paused = true)]
    async fn test_creates_profile_from_metadata_and_refreshes_session() {
        let backend = Arc::new(MemoryBackend::new());
        let (store, identity) = signed_in_store(&backend).await;
        assert!(store.snapshot().needs_profile());

        let reconciler = ProfileReconciler::new(backend.clone(), Duration::from_secs(1));
        let outcome = reconciler.reconcile(&store).await;
        assert!(matches!(outcome, ReconcileOutcome::Created(_)));

        let state = store.snapshot();
        assert_eq!(state.lookup, ProfileLookup::Found);
        let profile = state.profile.unwrap();
        assert_eq!(profile.id, identity.id);
        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.first_name, "Katherine");
        assert_eq!(profile.student_id.as_deref(), Some("S-1918"));
    }

    #[tokio::test]
    async fn test_created_profile_round_trips_through_fetcher() {
        let backend = Arc::new(MemoryBackend::new());
        let identity = backend.seed_account("kj@campus.edu", "orbits", metadata());
        let reconciler = ProfileReconciler::new(backend.clone(), Duration::ZERO);
        assert!(matches!(
            reconciler.ensure_profile(&identity).await,
            ReconcileOutcome::Created(_)
        ));

        let fetched = ProfileFetcher::new(backend.clone()).fetch(&identity.id).await;
        let profile = fetched.profile().unwrap();
        assert_eq!(profile.id, identity.id);
        assert_eq!(profile.role, Role::Student);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_create_exactly_one_profile() {
        let backend = Arc::new(MemoryBackend::new());
        let identity = backend.seed_account("kj@campus.edu", "orbits", metadata());
        // Both runs pass the re-check before either insert lands.
        backend.set_write_latency(Some(Duration::from_millis(50)));

        let reconciler = ProfileReconciler::new(backend.clone(), Duration::ZERO);
        let (first, second) = tokio::join!(
            reconciler.ensure_profile(&identity),
            reconciler.ensure_profile(&identity)
        );

        assert_eq!(backend.profile_count(), 1);
        assert_eq!(backend.insert_attempts(), 2);
        let outcomes = [first, second];
        assert_eq!(
            outcomes.iter().filter(|o| matches!(o, ReconcileOutcome::Created(_))).count(),
            1
        );
        assert!(outcomes.contains(&ReconcileOutcome::Conflict));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reconcile_calls_on_one_session() {
        let backend = Arc::new(MemoryBackend::new());
        let (store, identity) = signed_in_store(&backend).await;
        let reconciler = ProfileReconciler::new(backend.clone(), Duration::from_secs(1));

        let (a, b) = tokio::join!(reconciler.reconcile(&store), reconciler.reconcile(&store));
        assert!(a.profile_exists() || b.profile_exists());
        assert_eq!(backend.profile_count(), 1);
        assert_eq!(
            store.snapshot().profile.map(|p| p.id),
            Some(identity.id)
        );
    }

    #[tokio::test]
    async fn test_existing_row_is_not_recreated() {
        let backend = Arc::new(MemoryBackend::new());
        let (store, identity) = signed_in_store(&backend).await;
        // A backend trigger created the row after the session resolved.
        backend.put_profile(NewProfile::from_identity(&identity).into_profile(Utc::now()));

        let reconciler = ProfileReconciler::new(backend.clone(), Duration::ZERO);
        assert_eq!(reconciler.reconcile(&store).await, ReconcileOutcome::AlreadyExists);
        assert_eq!(backend.insert_attempts(), 0);
        assert!(store.snapshot().profile.is_some());
    }

    #[tokio::test]
    async fn test_permission_denied_never_inserts() {
        let backend = Arc::new(MemoryBackend::new());
        let identity = backend.seed_account("kj@campus.edu", "orbits", metadata());
        backend.fail_selects_with(Some(BackendError::PermissionDenied(
            "permission denied for table profiles".into(),
        )));

        let reconciler = ProfileReconciler::new(backend.clone(), Duration::ZERO);
        let outcome = reconciler.ensure_profile(&identity).await;
        assert!(matches!(outcome, ReconcileOutcome::Deferred(_)));
        assert_eq!(backend.insert_attempts(), 0);
        assert_eq!(backend.profile_count(), 0);
    }

    #[tokio::test]
    async fn test_permission_denied_session_is_skipped() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_selects_with(Some(BackendError::PermissionDenied("rls".into())));
        let (store, _) = signed_in_store(&backend).await;

        let reconciler = ProfileReconciler::new(backend.clone(), Duration::ZERO);
        assert_eq!(reconciler.reconcile(&store).await, ReconcileOutcome::Skipped);
        assert_eq!(backend.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_insert_failure_asks_for_manual_setup() {
        let backend = Arc::new(MemoryBackend::new());
        let (store, _) = signed_in_store(&backend).await;
        backend.fail_inserts_with(Some(BackendError::Backend {
            status: 400,
            code: "23502".into(),
            message: "null value in column \"email\"".into(),
        }));

        let reconciler = ProfileReconciler::new(backend.clone(), Duration::ZERO);
        let outcome = reconciler.reconcile(&store).await;
        assert_eq!(outcome.notice(), Some(&Notice::profile_setup_required()));
        assert!(store.snapshot().profile.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_during_settle_delay_skips_creation() {
        let backend = Arc::new(MemoryBackend::new());
        let (store, _) = signed_in_store(&backend).await;
        let reconciler = ProfileReconciler::new(backend.clone(), Duration::from_secs(1));

        let (outcome, _) = tokio::join!(reconciler.reconcile(&store), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.sign_out().await.unwrap();
        });
        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(backend.insert_attempts(), 0);
        // Signing out through the backend directly also works.
        assert!(backend.get_session().await.unwrap().is_none());
    }
}
