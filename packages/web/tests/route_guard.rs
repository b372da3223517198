use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use tower::ServiceExt;

use store::config::RoutesConfig;
use store::models::SignupMetadata;
use store::{AuthBackend, AuthSession, BackendError, Identity, MemoryBackend};
use web::guard::GuardState;
use web::server::{api_routes, with_guard};

const EMAIL: &str = "ada@campus.edu";
const PASSWORD: &str = "analytical";

fn app(backend: &Arc<MemoryBackend>, routes: RoutesConfig) -> Router {
    let state = GuardState::new(backend.clone(), routes);
    let pages = Router::new()
        .route("/", get(|| async { "home" }))
        .route("/materials", get(|| async { "materials" }))
        .route("/auth/login", get(|| async { "login" }))
        .route(
            "/profile/setup",
            get(|Extension(identity): Extension<Identity>| async move { identity.email }),
        )
        .route("/assets/main.css", get(|| async { "body {}" }))
        .merge(api_routes().with_state(state.clone()));
    with_guard(pages, state)
}

fn backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_account(EMAIL, PASSWORD, SignupMetadata::default());
    backend
}

async fn send(app: &Router, method: &str, uri: &str, cookie: Option<&str>, body: Body) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    if method == "POST" {
        request = request.header(header::CONTENT_TYPE, "application/json");
    }
    app.clone().oneshot(request.body(body).unwrap()).await.unwrap()
}

async fn get_page(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    send(app, "GET", uri, cookie, Body::empty()).await
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Sign in against the backend and sync the tokens; returns the cookie.
async fn signed_in(app: &Router, backend: &MemoryBackend) -> (String, AuthSession) {
    let session = backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();
    let body = Body::from(serde_json::to_vec(&session).unwrap());
    let response = send(app, "POST", "/auth/session", None, body).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    (cookie, session)
}

#[tokio::test]
async fn anonymous_visitor_is_sent_to_login() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());

    let response = get_page(&app, "/profile/setup", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/auth/login?redirectTo=%2Fprofile%2Fsetup");

    let response = get_page(&app, "/profile/setup?tab=academic", None).await;
    assert_eq!(location(&response), "/auth/login?redirectTo=%2Fprofile%2Fsetup");
}

#[tokio::test]
async fn public_pages_and_assets_pass() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());

    let response = get_page(&app, "/materials", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "materials");

    let response = get_page(&app, "/assets/main.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_page(&app, "/healthz", None).await;
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn synced_session_opens_protected_pages() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());
    let (cookie, _) = signed_in(&app, &backend).await;

    let response = get_page(&app, "/profile/setup", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, EMAIL);
}

#[tokio::test]
async fn expired_access_token_is_renewed() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());
    let (cookie, session) = signed_in(&app, &backend).await;
    backend.revoke_access_token(&session.access_token);

    let response = get_page(&app, "/profile/setup", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_page(&app, "/auth/session", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let held: AuthSession = serde_json::from_str(&body_text(response).await).unwrap();
    assert_ne!(held.access_token, session.access_token);
    assert_eq!(held.user.id, session.user.id);
}

#[tokio::test]
async fn unrenewable_session_is_dropped() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());
    let (cookie, session) = signed_in(&app, &backend).await;
    backend.revoke_access_token(&session.access_token);
    // Someone else rotated the refresh token first.
    backend.refresh_session(&session.refresh_token).await.unwrap();

    let response = get_page(&app, "/profile/setup", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let response = get_page(&app, "/auth/session", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn failed_renewal_keeps_session_for_next_request() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());
    let (cookie, session) = signed_in(&app, &backend).await;
    backend.revoke_access_token(&session.access_token);
    backend.fail_refreshes_with(Some(BackendError::Network("connection reset".into())));

    let response = get_page(&app, "/profile/setup", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let response = get_page(&app, "/auth/session", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let held: AuthSession = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(held.refresh_token, session.refresh_token);

    backend.fail_refreshes_with(None);
    let response = get_page(&app, "/profile/setup", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());
    let mut session = backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();

    let mut forged = session.clone();
    forged.access_token = "not-a-token".to_string();
    let body = Body::from(serde_json::to_vec(&forged).unwrap());
    let response = send(&app, "POST", "/auth/session", None, body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    session.user.id = "someone-else".to_string();
    let body = Body::from(serde_json::to_vec(&session).unwrap());
    let response = send(&app, "POST", "/auth/session", None, body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_out_closes_protected_pages() {
    let backend = backend();
    let app = app(&backend, RoutesConfig::default());
    let (cookie, _) = signed_in(&app, &backend).await;

    let response = send(&app, "POST", "/auth/signout", Some(&cookie), Body::empty()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_page(&app, "/profile/setup", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn auth_pages_redirect_signed_in_users_when_enabled() {
    let backend = backend();
    let routes = RoutesConfig {
        redirect_authenticated: true,
        ..RoutesConfig::default()
    };
    let app = app(&backend, routes);

    let response = get_page(&app, "/auth/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (cookie, _) = signed_in(&app, &backend).await;
    let response = get_page(&app, "/auth/login", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
}
