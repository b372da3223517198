use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use crate::backend::{AuthBackend, ProfileStore};
use crate::error::BackendError;
use crate::models::{
    AuthEvent, AuthEventKind, AuthSession, Identity, NewProfile, Profile, SignUpOutcome,
    SignupMetadata,
};
use crate::time;

const TOKEN_TTL_SECS: i64 = 3600;

/// In-memory auth + profiles backend for testing and offline development.
///
/// Enforces the same uniqueness rule as the real `profiles` table and can be
/// told to stall or fail individual calls.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<AuthEvent>,
}

#[derive(Debug)]
struct Account {
    identity: Identity,
    password: String,
}

#[derive(Debug, Default)]
struct Faults {
    auth_latency: Option<Duration>,
    write_latency: Option<Duration>,
    select_error: Option<BackendError>,
    insert_error: Option<BackendError>,
    sign_out_error: Option<BackendError>,
    refresh_error: Option<BackendError>,
    require_confirmation: bool,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    current: Option<AuthSession>,
    profiles: HashMap<String, Profile>,
    next_id: u64,
    faults: Faults,
    insert_attempts: usize,
    select_calls: usize,
}

impl State {
    fn identity(&self, user_id: &str) -> Option<Identity> {
        self.accounts
            .values()
            .find(|a| a.identity.id == user_id)
            .map(|a| a.identity.clone())
    }

    fn issue_session(&mut self, identity: Identity) -> AuthSession {
        self.next_id += 1;
        let access_token = format!("access-{}", self.next_id);
        let refresh_token = format!("refresh-{}", self.next_id);
        self.access_tokens
            .insert(access_token.clone(), identity.id.clone());
        self.refresh_tokens
            .insert(refresh_token.clone(), identity.id.clone());
        AuthSession {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: TOKEN_TTL_SECS,
            expires_at: None,
            user: identity,
        }
        .stamped(Utc::now())
    }

    fn revoke(&mut self, session: &AuthSession) {
        self.access_tokens.remove(&session.access_token);
        self.refresh_tokens.remove(&session.refresh_token);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, kind: AuthEventKind, session: Option<AuthSession>) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    async fn auth_delay(&self) {
        let latency = self.lock().faults.auth_latency;
        if let Some(latency) = latency {
            time::sleep(latency).await;
        }
    }

    async fn write_delay(&self) {
        let latency = self.lock().faults.write_latency;
        if let Some(latency) = latency {
            time::sleep(latency).await;
        }
    }

    /// Register an account without signing in.
    pub fn seed_account(&self, email: &str, password: &str, metadata: SignupMetadata) -> Identity {
        let mut state = self.lock();
        state.next_id += 1;
        let identity = Identity::new(
            format!("00000000-0000-4000-8000-{:012}", state.next_id),
            email,
        )
        .with_metadata(metadata);
        state.accounts.insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        identity
    }

    /// Store a row directly, bypassing the insert path and its counters.
    pub fn put_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.id.clone(), profile);
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        self.lock().profiles.get(id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.lock().profiles.len()
    }

    pub fn insert_attempts(&self) -> usize {
        self.lock().insert_attempts
    }

    pub fn select_calls(&self) -> usize {
        self.lock().select_calls
    }

    /// The session this client holds, without any latency or validation.
    pub fn held_session(&self) -> Option<AuthSession> {
        self.lock().current.clone()
    }

    /// Stall `get_session` and `get_current_user` for `latency`.
    pub fn set_auth_latency(&self, latency: Option<Duration>) {
        self.lock().faults.auth_latency = latency;
    }

    /// Stall inserts and upserts before they touch the table.
    pub fn set_write_latency(&self, latency: Option<Duration>) {
        self.lock().faults.write_latency = latency;
    }

    pub fn fail_selects_with(&self, error: Option<BackendError>) {
        self.lock().faults.select_error = error;
    }

    pub fn fail_inserts_with(&self, error: Option<BackendError>) {
        self.lock().faults.insert_error = error;
    }

    pub fn fail_sign_out_with(&self, error: Option<BackendError>) {
        self.lock().faults.sign_out_error = error;
    }

    /// Fail `refresh_session` without consuming the refresh token.
    pub fn fail_refreshes_with(&self, error: Option<BackendError>) {
        self.lock().faults.refresh_error = error;
    }

    /// Signups return no session until the email is confirmed.
    pub fn require_email_confirmation(&self, required: bool) {
        self.lock().faults.require_confirmation = required;
    }

    /// Invalidate an access token as if it had expired server-side.
    pub fn revoke_access_token(&self, access_token: &str) {
        self.lock().access_tokens.remove(access_token);
    }

    /// Push an arbitrary event onto the auth stream.
    pub fn push_event(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthBackend for MemoryBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError> {
        self.auth_delay().await;
        Ok(self.lock().current.clone())
    }

    async fn get_current_user(&self) -> Result<Option<Identity>, BackendError> {
        self.auth_delay().await;
        let current = self.lock().current.clone();
        match current {
            Some(session) => self.get_user(&session.access_token).await.map(Some),
            None => Ok(None),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, BackendError> {
        let state = self.lock();
        state
            .access_tokens
            .get(access_token)
            .and_then(|user_id| state.identity(user_id))
            .ok_or_else(|| BackendError::Unauthorized("invalid JWT".to_string()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let (session, held) = {
            let mut state = self.lock();
            if let Some(error) = state.faults.refresh_error.clone() {
                return Err(error);
            }
            let user_id = state
                .refresh_tokens
                .remove(refresh_token)
                .ok_or_else(|| BackendError::Unauthorized("invalid refresh token".to_string()))?;
            let identity = state
                .identity(&user_id)
                .ok_or_else(|| BackendError::Unauthorized("user not found".to_string()))?;
            let session = state.issue_session(identity);
            let held = state
                .current
                .as_ref()
                .is_some_and(|c| c.refresh_token == refresh_token);
            if held {
                state.current = Some(session.clone());
            }
            (session, held)
        };
        if held {
            self.emit(AuthEventKind::TokenRefreshed, Some(session.clone()));
        }
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignupMetadata,
    ) -> Result<SignUpOutcome, BackendError> {
        if self.lock().accounts.contains_key(email) {
            return Err(BackendError::Backend {
                status: 422,
                code: "user_already_exists".to_string(),
                message: "User already registered".to_string(),
            });
        }
        let identity = self.seed_account(email, password, metadata.clone());
        let session = {
            let mut state = self.lock();
            if state.faults.require_confirmation {
                None
            } else {
                let session = state.issue_session(identity.clone());
                state.current = Some(session.clone());
                Some(session)
            }
        };
        if let Some(ref session) = session {
            self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        }
        Ok(SignUpOutcome { identity, session })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let session = {
            let mut state = self.lock();
            let identity = match state.accounts.get(email) {
                Some(account) if account.password == password => account.identity.clone(),
                _ => {
                    return Err(BackendError::Backend {
                        status: 400,
                        code: "invalid_credentials".to_string(),
                        message: "Invalid login credentials".to_string(),
                    })
                }
            };
            let session = state.issue_session(identity);
            state.current = Some(session.clone());
            session
        };
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let failure = {
            let mut state = self.lock();
            let failure = state.faults.sign_out_error.clone();
            if let Some(session) = state.current.take() {
                if failure.is_none() {
                    state.revoke(&session);
                }
            }
            failure
        };
        self.emit(AuthEventKind::SignedOut, None);
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProfileStore for MemoryBackend {
    async fn select_profile_by_id(&self, id: &str) -> Result<Option<Profile>, BackendError> {
        let mut state = self.lock();
        state.select_calls += 1;
        if let Some(error) = state.faults.select_error.clone() {
            return Err(error);
        }
        Ok(state.profiles.get(id).cloned())
    }

    async fn insert_profile(&self, record: &NewProfile) -> Result<Profile, BackendError> {
        self.lock().insert_attempts += 1;
        self.write_delay().await;
        let mut state = self.lock();
        if let Some(error) = state.faults.insert_error.clone() {
            return Err(error);
        }
        if state.profiles.contains_key(&record.id) {
            return Err(BackendError::Conflict);
        }
        let profile = record.clone().into_profile(Utc::now());
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn upsert_profile(&self, record: &NewProfile) -> Result<Profile, BackendError> {
        self.write_delay().await;
        let mut state = self.lock();
        if let Some(error) = state.faults.insert_error.clone() {
            return Err(error);
        }
        let now = Utc::now();
        let mut profile = record.clone().into_profile(now);
        if let Some(existing) = state.profiles.get(&record.id) {
            profile.created_at = existing.created_at;
            profile.avatar_url = existing.avatar_url.clone();
        }
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> SignupMetadata {
        SignupMetadata {
            first_name: Some("Grace".into()),
            last_name: Some("Hopper".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sign_in_emits_event_and_holds_session() {
        let backend = MemoryBackend::new();
        let mut events = backend.subscribe();
        backend.seed_account("grace@campus.edu", "cobol1959", metadata());

        let session = backend
            .sign_in_with_password("grace@campus.edu", "cobol1959")
            .await
            .unwrap();
        assert_eq!(backend.held_session(), Some(session.clone()));

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, AuthEventKind::SignedIn);
        assert_eq!(event.identity().unwrap().email, "grace@campus.edu");

        let user = backend.get_user(&session.access_token).await.unwrap();
        assert_eq!(user.metadata.first_name.as_deref(), Some("Grace"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let backend = MemoryBackend::new();
        backend.seed_account("grace@campus.edu", "cobol1959", metadata());
        let err = backend
            .sign_in_with_password("grace@campus.edu", "fortran")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Backend { status: 400, .. }));
        assert!(backend.held_session().is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let backend = MemoryBackend::new();
        backend.seed_account("grace@campus.edu", "cobol1959", metadata());
        let session = backend
            .sign_in_with_password("grace@campus.edu", "cobol1959")
            .await
            .unwrap();

        let renewed = backend.refresh_session(&session.refresh_token).await.unwrap();
        assert_ne!(renewed.access_token, session.access_token);
        assert_eq!(backend.held_session(), Some(renewed));

        // A refresh token is single-use.
        let again = backend.refresh_session(&session.refresh_token).await;
        assert!(again.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_id() {
        let backend = MemoryBackend::new();
        let identity = backend.seed_account("grace@campus.edu", "pw", metadata());
        let record = NewProfile::from_identity(&identity);

        let created = backend.insert_profile(&record).await.unwrap();
        assert_eq!(created.id, identity.id);
        assert_eq!(
            backend.insert_profile(&record).await.unwrap_err(),
            BackendError::Conflict
        );
        assert_eq!(backend.profile_count(), 1);
        assert_eq!(backend.insert_attempts(), 2);
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let backend = MemoryBackend::new();
        let identity = backend.seed_account("grace@campus.edu", "pw", metadata());
        let mut record = NewProfile::from_identity(&identity);
        let created = backend.insert_profile(&record).await.unwrap();

        record.major = Some("Computer Science".into());
        let updated = backend.upsert_profile(&record).await.unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(
            backend.profile(&identity.id).unwrap().major.as_deref(),
            Some("Computer Science")
        );
    }

    #[tokio::test]
    async fn test_sign_out_failure_still_drops_local_session() {
        let backend = MemoryBackend::new();
        backend.seed_account("grace@campus.edu", "pw", metadata());
        backend
            .sign_in_with_password("grace@campus.edu", "pw")
            .await
            .unwrap();
        backend.fail_sign_out_with(Some(BackendError::Network("offline".into())));

        assert!(backend.sign_out().await.is_err());
        assert!(backend.held_session().is_none());
    }
}
