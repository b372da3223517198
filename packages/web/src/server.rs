//! HTTP surface of the web server apart from the app itself: the session
//! sync endpoints used by the client, a health check, and the layers every
//! route runs behind.

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use store::AuthSession;

use crate::guard::{route_guard, GuardState, SESSION_KEY};

/// Routes that do not render the app.
pub fn api_routes() -> Router<GuardState> {
    Router::new()
        .route("/auth/session", get(get_session).post(store_session))
        .route("/auth/signout", post(sign_out))
        .route("/healthz", get(healthz))
}

/// Wrap `router` in the route guard and the cookie session it reads.
pub fn with_guard(router: Router, state: GuardState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(7)));

    router
        .layer(from_fn_with_state(state, route_guard))
        .layer(session_layer)
}

/// Router with the session endpoints behind the guard, without the app.
pub fn router(state: GuardState) -> Router {
    with_guard(api_routes().with_state(state.clone()), state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Return the (already refreshed) session held for this browser.
async fn get_session(session: Session) -> Response {
    match session.get::<AuthSession>(SESSION_KEY).await {
        Ok(Some(stored)) => Json(stored).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("failed to read session: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Accept the client's token pair after checking it with the auth backend.
async fn store_session(
    State(state): State<GuardState>,
    session: Session,
    Json(tokens): Json<AuthSession>,
) -> StatusCode {
    let identity = match state.auth.get_user(&tokens.access_token).await {
        Ok(identity) => identity,
        Err(e) if e.is_auth() => {
            tracing::warn!("rejected session sync: {}", e);
            return StatusCode::UNAUTHORIZED;
        }
        Err(e) => {
            tracing::error!("could not verify synced session: {}", e);
            return StatusCode::BAD_GATEWAY;
        }
    };
    if identity.id != tokens.user.id {
        tracing::warn!(claimed = %tokens.user.id, actual = %identity.id, "session sync user mismatch");
        return StatusCode::UNAUTHORIZED;
    }
    if let Err(e) = session.insert(SESSION_KEY, tokens).await {
        tracing::error!("failed to store session: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    tracing::debug!(user = %identity.id, "session synced from client");
    StatusCode::NO_CONTENT
}

async fn sign_out(session: Session) -> StatusCode {
    if let Err(e) = session.flush().await {
        tracing::error!("failed to clear session: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::NO_CONTENT
}
