//! # Backend contracts
//!
//! The session layer talks to two services and nothing else:
//!
//! - [`AuthBackend`]: identity and token management (GoTrue in production).
//!   Besides request/response calls it exposes an event stream
//!   ([`AuthBackend::subscribe`]) that reports sign-in, sign-out and token
//!   refresh in the order they happen.
//! - [`ProfileStore`]: the `profiles` table (PostgREST in production). The
//!   store must enforce uniqueness of `Profile::id`: a second insert for the
//!   same id fails with [`BackendError::Conflict`]. Profile reconciliation
//!   relies on that guarantee instead of any client-side lock.
//!
//! Implementations: [`crate::MemoryBackend`] here, and the HTTP client in the
//! `api` crate. On WASM the futures are not `Send`.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::BackendError;
use crate::models::{AuthEvent, AuthSession, Identity, NewProfile, Profile, SignUpOutcome, SignupMetadata};

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AuthBackend: Send + Sync {
    /// The session this client currently holds, refreshed first if it expired.
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError>;

    /// Re-validate the held session with the backend and return its user.
    async fn get_current_user(&self) -> Result<Option<Identity>, BackendError>;

    /// Resolve the user an access token belongs to.
    async fn get_user(&self, access_token: &str) -> Result<Identity, BackendError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignupMetadata,
    ) -> Result<SignUpOutcome, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    /// Revoke the held session. The local copy is dropped even when the
    /// backend call fails.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Subscribe to auth state changes, delivered in arrival order.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when no row exists for `id`.
    async fn select_profile_by_id(&self, id: &str) -> Result<Option<Profile>, BackendError>;

    /// Insert a new row; `Err(BackendError::Conflict)` if one already exists.
    async fn insert_profile(&self, record: &NewProfile) -> Result<Profile, BackendError>;

    /// Insert or update on conflict of `id`.
    async fn upsert_profile(&self, record: &NewProfile) -> Result<Profile, BackendError>;
}
