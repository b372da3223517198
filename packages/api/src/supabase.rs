//! # Supabase-compatible backend client
//!
//! Implements both backend contracts over HTTP:
//!
//! - [`AuthBackend`] against GoTrue (`/auth/v1`): `signup`, `token?grant_type=password`,
//!   `token?grant_type=refresh_token`, `user`, `logout`.
//! - [`ProfileStore`] against PostgREST (`/rest/v1/profiles`): filtered select,
//!   insert with `Prefer: return=representation`, and upsert with
//!   `on_conflict=id` + `resolution=merge-duplicates`.
//!
//! A [`SupabaseClient`] holds the current session and publishes
//! [`AuthEvent`]s whenever that session changes. Data requests carry the user's access token when one is held so
//! row-level-security policies see the right user; otherwise the anon key.
//!
//! Every error response is mapped through [`BackendError::classify`].

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use store::{
    AuthBackend, AuthEvent, AuthEventKind, AuthSession, BackendError, Identity, NewProfile,
    Profile, ProfileStore, SignUpOutcome, SignupMetadata,
};

use crate::config::{BackendConfig, ConfigError};

const PROFILES_TABLE: &str = "profiles";

/// Error body shapes of GoTrue and PostgREST, merged.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> String {
        self.error_code
            .clone()
            .or_else(|| match &self.code {
                Some(serde_json::Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }

    fn message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_decode() {
        BackendError::Decode(e.to_string())
    } else {
        BackendError::Network(e.to_string())
    }
}

async fn error_from(response: Response) -> BackendError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = match body.message() {
        m if m.is_empty() => text,
        m => m,
    };
    BackendError::classify(status, &body.code(), &message)
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    response.json::<T>().await.map_err(transport)
}

/// HTTP client for a Supabase project.
#[derive(Clone, Debug)]
pub struct SupabaseClient {
    http: Client,
    url: String,
    anon_key: String,
    session: Arc<Mutex<Option<AuthSession>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    /// Create a client; fails if the URL or key is missing.
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        let (url, anon_key) = config.require()?;
        let (events, _) = broadcast::channel(32);
        Ok(Self {
            http: Client::new(),
            url,
            anon_key,
            session: Arc::new(Mutex::new(None)),
            events,
        })
    }

    /// Hold a session without announcing it. The next `get_session` (for
    /// instance during session bootstrap) picks it up.
    pub fn restore_session(&self, session: AuthSession) {
        *self.held() = Some(session);
    }

    fn held(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, kind: AuthEventKind, session: Option<AuthSession>) {
        let _ = self.events.send(AuthEvent::new(kind, session));
    }

    fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    fn rest_endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    /// Attach the API key and a bearer token (the user's if held).
    fn authorized(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let held = self.held().as_ref().map(|s| s.access_token.clone());
        let bearer = token
            .map(str::to_string)
            .or(held)
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<AuthSession, BackendError> {
        let request = self
            .http
            .post(self.auth_endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body);
        let response = request.send().await.map_err(transport)?;
        let session: AuthSession = parse(response).await?;
        Ok(session.stamped(Utc::now()))
    }

    async fn first_row(response: Response) -> Result<Profile, BackendError> {
        let rows: Vec<Profile> = parse(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("empty representation".to_string()))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthBackend for SupabaseClient {
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError> {
        let held = self.held().clone();
        let Some(session) = held else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }
        tracing::debug!("held session expired, refreshing");
        match self.refresh_session(&session.refresh_token).await {
            Ok(renewed) => Ok(Some(renewed)),
            Err(e) if e.is_auth() => {
                tracing::warn!("refresh rejected, dropping session: {}", e);
                *self.held() = None;
                self.emit(AuthEventKind::SignedOut, None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_current_user(&self) -> Result<Option<Identity>, BackendError> {
        match self.get_session().await? {
            Some(session) => self.get_user(&session.access_token).await.map(Some),
            None => Ok(None),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, BackendError> {
        let request = self
            .http
            .get(self.auth_endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        let response = request.send().await.map_err(transport)?;
        parse(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let session = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        let held = {
            let mut held = self.held();
            let matches = held
                .as_ref()
                .is_some_and(|s| s.refresh_token == refresh_token);
            if matches {
                *held = Some(session.clone());
            }
            matches
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
        let request = self
            .http
            .post(self.auth_endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }));
        let response = request.send().await.map_err(transport)?;
        let body: serde_json::Value = parse(response).await?;

        // With autoconfirm the backend answers with a session, otherwise with
        // the bare user awaiting email confirmation.
        if body.get("access_token").is_some() {
            let session: AuthSession =
                serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
            let session = session.stamped(Utc::now());
            *self.held() = Some(session.clone());
            self.emit(AuthEventKind::SignedIn, Some(session.clone()));
            return Ok(SignUpOutcome {
                identity: session.user.clone(),
                session: Some(session),
            });
        }
        let user = body.get("user").cloned().unwrap_or(body);
        let identity: Identity =
            serde_json::from_value(user).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(SignUpOutcome {
            identity,
            session: None,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        *self.held() = Some(session.clone());
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let held = self.held().take();
        self.emit(AuthEventKind::SignedOut, None);
        let Some(session) = held else {
            return Ok(());
        };
        let request = self
            .http
            .post(self.auth_endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token);
        let response = request.send().await.map_err(transport)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from(response).await)
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProfileStore for SupabaseClient {
    async fn select_profile_by_id(&self, id: &str) -> Result<Option<Profile>, BackendError> {
        let request = self
            .http
            .get(self.rest_endpoint(PROFILES_TABLE))
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())]);
        let response = self
            .authorized(request, None)
            .send()
            .await
            .map_err(transport)?;
        let rows: Vec<Profile> = parse(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, record: &NewProfile) -> Result<Profile, BackendError> {
        let request = self
            .http
            .post(self.rest_endpoint(PROFILES_TABLE))
            .header("Prefer", "return=representation")
            .json(record);
        let response = self
            .authorized(request, None)
            .send()
            .await
            .map_err(transport)?;
        Self::first_row(response).await
    }

    async fn upsert_profile(&self, record: &NewProfile) -> Result<Profile, BackendError> {
        let request = self
            .http
            .post(self.rest_endpoint(PROFILES_TABLE))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(record);
        let response = self
            .authorized(request, None)
            .send()
            .await
            .map_err(transport)?;
        Self::first_row(response).await
    }
}
