//! # Route guard
//!
//! Runs in front of every page request. Static assets pass straight through.
//! For everything else the guard first refreshes the auth session held in the
//! cookie session (validate the access token, renew it through the refresh
//! token when the backend rejects it, drop tokens the backend refuses to
//! renew) and
//! then applies the [`RoutePolicy`]:
//!
//! | Path | Signed out | Signed in |
//! |------|------------|-----------|
//! | protected prefix | 307 to login with `redirectTo` | pass |
//! | auth route | pass | pass, or 307 home when `redirect_authenticated` |
//! | anything else | pass | pass |
//!
//! The resolved [`Identity`] is added to the request extensions for handlers
//! further down.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;

use store::config::RoutesConfig;
use store::{AuthBackend, AuthSession, Identity};

/// Key of the token pair inside the cookie session.
pub const SESSION_KEY: &str = "auth_session";

const STATIC_PREFIXES: [&str; 3] = ["/assets/", "/wasm/", "/_dioxus"];
const STATIC_EXTENSIONS: [&str; 14] = [
    "css", "js", "mjs", "wasm", "map", "ico", "png", "jpg", "jpeg", "gif", "svg", "webp", "woff",
    "woff2",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    Auth,
    Public,
    Static,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Redirect(String),
}

#[derive(Clone, Debug)]
pub struct RoutePolicy {
    routes: RoutesConfig,
}

impl RoutePolicy {
    pub fn new(routes: RoutesConfig) -> Self {
        Self { routes }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        if is_static(path) {
            return RouteClass::Static;
        }
        if self.routes.auth_routes.iter().any(|route| route == path) {
            return RouteClass::Auth;
        }
        if self
            .routes
            .protected
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return RouteClass::Protected;
        }
        RouteClass::Public
    }

    /// `target` is the requested path to come back to after login.
    pub fn decide(&self, class: RouteClass, target: &str, signed_in: bool) -> Decision {
        match class {
            RouteClass::Protected if !signed_in => Decision::Redirect(self.login_redirect(target)),
            RouteClass::Auth if signed_in && self.routes.redirect_authenticated => {
                Decision::Redirect(self.routes.home_path.clone())
            }
            _ => Decision::Pass,
        }
    }

    pub fn login_redirect(&self, target: &str) -> String {
        format!(
            "{}?redirectTo={}",
            self.routes.login_path,
            urlencoding::encode(target)
        )
    }
}

fn is_static(path: &str) -> bool {
    if STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            STATIC_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Shared state of the guard and the session endpoints.
#[derive(Clone)]
pub struct GuardState {
    pub auth: Arc<dyn AuthBackend>,
    pub policy: RoutePolicy,
}

impl GuardState {
    pub fn new(auth: Arc<dyn AuthBackend>, routes: RoutesConfig) -> Self {
        Self {
            auth,
            policy: RoutePolicy::new(routes),
        }
    }
}

/// Validate the tokens held in `session`, renewing them if needed.
pub async fn refresh_identity(auth: &dyn AuthBackend, session: &Session) -> Option<Identity> {
    let stored = match session.get::<AuthSession>(SESSION_KEY).await {
        Ok(stored) => stored?,
        Err(e) => {
            tracing::error!("failed to read cookie session: {}", e);
            return None;
        }
    };

    match auth.get_user(&stored.access_token).await {
        Ok(identity) => Some(identity),
        Err(e) if e.is_auth() => match auth.refresh_session(&stored.refresh_token).await {
            Ok(renewed) => {
                tracing::debug!(user = %renewed.user.id, "renewed access token");
                let identity = renewed.user.clone();
                if let Err(e) = session.insert(SESSION_KEY, renewed).await {
                    tracing::error!("failed to store renewed session: {}", e);
                }
                Some(identity)
            }
            Err(e) if e.is_auth() => {
                tracing::debug!("dropping unusable session: {}", e);
                if let Err(e) = session.remove::<AuthSession>(SESSION_KEY).await {
                    tracing::error!("failed to drop session: {}", e);
                }
                None
            }
            Err(e) => {
                tracing::warn!("token renewal failed, keeping session for the next request: {}", e);
                None
            }
        },
        Err(e) => {
            // Keep the tokens; the backend may be back on the next request.
            tracing::warn!("token check failed, treating request as signed out: {}", e);
            None
        }
    }
}

/// axum middleware enforcing the [`RoutePolicy`].
pub async fn route_guard(
    State(state): State<GuardState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let class = state.policy.classify(&path);
    if class == RouteClass::Static {
        return next.run(req).await;
    }

    let identity = refresh_identity(&*state.auth, &session).await;
    // `redirectTo` carries the path only; the query string is not kept.
    let target = path;

    match state.policy.decide(class, &target, identity.is_some()) {
        Decision::Pass => {
            if let Some(identity) = identity {
                req.extensions_mut().insert(identity);
            }
            next.run(req).await
        }
        Decision::Redirect(location) => {
            tracing::debug!(%target, %location, "redirecting");
            Redirect::temporary(&location).into_response()
        }
    }
}
