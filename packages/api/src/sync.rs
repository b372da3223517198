//! Hand the client's session to the web server and take it back on reload.
//!
//! The route guard only sees cookies, so after every auth change the client
//! posts its tokens to `/auth/session` (or `/auth/signout`), and the server
//! keeps them in its cookie session. On startup the client asks for them
//! again with `GET /auth/session`.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use store::time;
use store::{AuthSession, BackendError};

pub const SESSION_PATH: &str = "/auth/session";
pub const SIGNOUT_PATH: &str = "/auth/signout";

#[derive(Clone, Debug)]
pub struct ServerSync {
    http: Client,
    base: String,
}

impl ServerSync {
    /// `origin` is the scheme and host the app was served from.
    pub fn new(origin: &str) -> Self {
        Self {
            http: Client::new(),
            base: origin.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// The session the server holds for this browser, if any.
    pub async fn restore(&self) -> Result<Option<AuthSession>, BackendError> {
        let response = self
            .http
            .get(self.endpoint(SESSION_PATH))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::UNAUTHORIZED => Ok(None),
            status if status.is_success() => response
                .json::<AuthSession>()
                .await
                .map(Some)
                .map_err(|e| BackendError::Decode(e.to_string())),
            status => Err(BackendError::classify(status.as_u16(), "", "session restore failed")),
        }
    }

    /// [`restore`](Self::restore) bounded by `limit`. Browser fetches have
    /// no timeout of their own.
    pub async fn restore_within(&self, limit: Duration) -> Result<Option<AuthSession>, BackendError> {
        time::timeout(limit, self.restore())
            .await
            .map_err(|_| BackendError::Timeout)?
    }

    /// Store `session` on the server, or clear it when `None`.
    pub async fn push(&self, session: Option<&AuthSession>) -> Result<(), BackendError> {
        let request = match session {
            Some(session) => self.http.post(self.endpoint(SESSION_PATH)).json(session),
            None => self.http.post(self.endpoint(SIGNOUT_PATH)),
        };
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::classify(status.as_u16(), "", "session sync rejected"))
        }
    }
}
