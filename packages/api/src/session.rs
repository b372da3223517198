//! # Session store
//!
//! A [`SessionStore`] owns one [`SessionState`]: the current [`Identity`],
//! its [`Profile`] (if any), how the last profile lookup went, and whether the
//! initial bootstrap is still running. The state is published through a
//! `tokio::sync::watch` channel so any number of readers can follow it; only
//! the store writes.
//!
//! ## Transitions
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`initialize`](SessionStore::initialize) | Read the held session, fetch its profile. `loading` drops to `false` after `init_timeout` at the latest; a slower bootstrap still commits unless a newer transition got there first. |
//! | [`on_auth_state_changed`](SessionStore::on_auth_state_changed) | Pair the new identity with a freshly fetched profile, or clear both on sign-out. |
//! | [`sign_out`](SessionStore::sign_out) | Backend sign-out, then clear locally whatever the backend said. |
//! | [`refresh_profile`](SessionStore::refresh_profile) | Re-fetch the profile of the current identity. |
//! | [`listen`](SessionStore::listen) | Apply the backend's auth events in arrival order. |
//!
//! Transitions are serialized by an async mutex and each one publishes the
//! identity and profile together, so no reader ever sees a profile next to an
//! identity it does not belong to.

use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

use store::config::SessionConfig;
use store::time;
use store::{AuthBackend, AuthEvent, AuthEventKind, BackendError, Identity, Profile, ProfileStore};

use crate::fetcher::{FetchOutcome, ProfileFetcher};

/// How the last profile lookup for the current identity went.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProfileLookup {
    /// No identity, nothing to look up.
    #[default]
    Idle,
    Found,
    /// The backend has no row; reconciliation may create one.
    Missing,
    /// The lookup failed for a reason other than absence.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub lookup: ProfileLookup,
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            lookup: ProfileLookup::Idle,
            loading: true,
        }
    }
}

impl SessionState {
    pub fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::default()
        }
    }

    /// A resolved identity paired with the outcome of its profile lookup.
    pub fn resolved(identity: Identity, outcome: FetchOutcome) -> Self {
        let mut state = Self {
            identity: Some(identity),
            loading: false,
            ..Self::default()
        };
        state.apply(outcome);
        state
    }

    /// Fold a lookup outcome into the state. A transient failure keeps a
    /// profile that was already loaded.
    fn apply(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Found(profile) => {
                self.profile = Some(profile);
                self.lookup = ProfileLookup::Found;
            }
            FetchOutcome::NotFound => {
                self.profile = None;
                self.lookup = ProfileLookup::Missing;
            }
            FetchOutcome::TransientError(e) => {
                if self.profile.is_none() {
                    self.lookup = ProfileLookup::Failed(e.to_string());
                }
            }
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Signed in and the backend confirmed there is no profile row.
    pub fn needs_profile(&self) -> bool {
        self.identity.is_some() && self.lookup == ProfileLookup::Missing
    }

    fn identity_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.id.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The local session was cleared but the backend did not confirm.
    #[error("sign-out was not confirmed by the backend: {0}")]
    SignOut(BackendError),
}

pub struct SessionStore {
    auth: Arc<dyn AuthBackend>,
    fetcher: ProfileFetcher,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    transitions: tokio::sync::Mutex<()>,
    /// Bumped by every commit; lets a slow bootstrap notice it is stale.
    generation: AtomicU64,
    events: Mutex<Option<broadcast::Receiver<AuthEvent>>>,
}

impl SessionStore {
    /// Create a store in the `loading` state. The auth event subscription is
    /// taken here so nothing emitted before [`listen`](Self::listen) is lost.
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        profiles: Arc<dyn ProfileStore>,
        config: SessionConfig,
    ) -> Self {
        let events = auth.subscribe();
        let (state, _) = watch::channel(SessionState::default());
        Self {
            auth,
            fetcher: ProfileFetcher::new(profiles),
            config,
            state,
            transitions: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            events: Mutex::new(Some(events)),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn auth(&self) -> &Arc<dyn AuthBackend> {
        &self.auth
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn commit(&self, next: SessionState) {
        tracing::debug!(
            user = next.identity_id().unwrap_or("-"),
            lookup = ?next.lookup,
            "session updated"
        );
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(next);
    }

    async fn fetch(&self, identity_id: &str) -> FetchOutcome {
        match time::timeout(self.config.request_timeout(), self.fetcher.fetch(identity_id)).await {
            Ok(outcome) => outcome,
            Err(elapsed) => {
                tracing::warn!(user = identity_id, "profile fetch gave up: {}", elapsed);
                FetchOutcome::TransientError(BackendError::Timeout)
            }
        }
    }

    async fn resolve(&self, identity: Identity) -> SessionState {
        let outcome = self.fetch(&identity.id).await;
        SessionState::resolved(identity, outcome)
    }

    /// Bootstrap the session.
    ///
    /// `loading` is `false` once `init_timeout` has passed, whatever the
    /// backend does. The bootstrap itself is not abandoned: a session that
    /// resolves late is still committed, unless an auth event or sign-out
    /// was applied in the meantime. The call returns when the bootstrap does,
    /// so run it apart from [`listen`](Self::listen).
    pub async fn initialize(&self) {
        let limit = self.config.init_timeout();
        let mut bootstrap = pin!(self.bootstrap());
        if time::timeout(limit, bootstrap.as_mut()).await.is_ok() {
            return;
        }
        tracing::warn!("session bootstrap exceeded {:?}, continuing in the background", limit);
        self.state.send_if_modified(|state| std::mem::replace(&mut state.loading, false));
        bootstrap.await;
    }

    async fn bootstrap(&self) {
        let started = self.generation.load(Ordering::SeqCst);
        let next = match self.auth.get_session().await {
            Ok(Some(session)) => self.resolve(session.user).await,
            Ok(None) => SessionState::signed_out(),
            Err(e) if e.is_auth() => {
                tracing::debug!("stored session rejected: {}", e);
                SessionState::signed_out()
            }
            Err(e) => {
                tracing::warn!("could not read session: {}", e);
                SessionState::signed_out()
            }
        };
        let _transition = self.transitions.lock().await;
        if self.generation.load(Ordering::SeqCst) != started {
            tracing::debug!("bootstrap superseded by a newer transition");
            self.state.send_if_modified(|state| std::mem::replace(&mut state.loading, false));
            return;
        }
        self.commit(next);
    }

    /// Apply one auth state transition.
    pub async fn on_auth_state_changed(&self, kind: AuthEventKind, identity: Option<Identity>) {
        let _transition = self.transitions.lock().await;
        tracing::debug!(?kind, user = identity.as_ref().map(|i| i.id.as_str()).unwrap_or("-"), "auth state change");

        let next = match identity {
            None => SessionState::signed_out(),
            Some(identity) => {
                let current = self.snapshot();
                let same_user = current.identity_id() == Some(identity.id.as_str());
                if same_user && kind == AuthEventKind::TokenRefreshed && current.profile.is_some() {
                    SessionState {
                        identity: Some(identity),
                        loading: false,
                        ..current
                    }
                } else if same_user {
                    // Same user again: a failed lookup must not drop the
                    // profile already loaded.
                    let outcome = self.fetch(&identity.id).await;
                    let mut next = SessionState {
                        identity: Some(identity),
                        loading: false,
                        ..current
                    };
                    next.apply(outcome);
                    next
                } else {
                    self.resolve(identity).await
                }
            }
        };
        self.commit(next);
    }

    /// Sign out. Local state is cleared even when the backend call fails; the
    /// failure is logged and returned so the caller can tell the user.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let _transition = self.transitions.lock().await;
        let result = self.auth.sign_out().await;
        self.commit(SessionState::signed_out());
        result.map_err(|e| {
            tracing::warn!("backend sign-out failed, local session cleared anyway: {}", e);
            SessionError::SignOut(e)
        })
    }

    /// Re-fetch the profile of the current identity. No-op when signed out.
    pub async fn refresh_profile(&self) {
        let _transition = self.transitions.lock().await;
        let Some(identity_id) = self.snapshot().identity_id().map(str::to_string) else {
            return;
        };
        let outcome = self.fetch(&identity_id).await;
        self.state.send_modify(|state| {
            // Discard the result if the identity changed underneath it.
            if state.identity_id() == Some(identity_id.as_str()) {
                state.apply(outcome);
            }
        });
    }

    /// Follow the backend's auth event stream until it closes. Only the
    /// first call listens; later calls return immediately.
    pub async fn listen(&self) {
        let taken = {
            let mut slot = self.events.lock().unwrap_or_else(|p| p.into_inner());
            slot.take()
        };
        let Some(mut events) = taken else {
            tracing::warn!("auth event listener already running");
            return;
        };
        loop {
            match events.recv().await {
                Ok(event) => {
                    let identity = event.session.map(|s| s.user);
                    self.on_auth_state_changed(event.kind, identity).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth events lagged, re-reading session");
                    match self.auth.get_session().await {
                        Ok(session) => {
                            self.on_auth_state_changed(
                                AuthEventKind::InitialSession,
                                session.map(|s| s.user),
                            )
                            .await
                        }
                        Err(e) => tracing::warn!("could not re-read session: {}", e),
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
