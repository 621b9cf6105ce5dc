//! Authentication gate middleware
//!
//! Per-request pipeline: extract a bearer token (Authorization header or
//! session cookie), verify signature and expiry, resolve the subject
//! against the active-only repository read, and reject sessions issued
//! before the last password change. On success the resolved traveller is
//! attached to request extensions for downstream handlers.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use wayfarer_db::{Database, Traveller};

use crate::error::AuthError;
use crate::token::TokenService;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// How the gate answers unauthenticated requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStyle {
    /// Classified 401 JSON, for API clients
    Api,
    /// Redirect to the login surface, for browser clients
    Browser,
}

/// The authenticated traveller, attached to request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Traveller);

/// Authentication gate state
#[derive(Clone)]
pub struct SessionGate {
    tokens: TokenService,
    db: Database,
    response_style: ResponseStyle,
    login_path: String,
}

impl SessionGate {
    pub fn new(
        tokens: TokenService,
        db: Database,
        response_style: ResponseStyle,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            db,
            response_style,
            login_path: login_path.into(),
        }
    }

    /// Pull a token out of the request; the Authorization header wins over
    /// the cookie when both are present.
    fn extract_token(request: &Request) -> Option<String> {
        if let Some(header) = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            && let Some(token) = header.strip_prefix("Bearer ")
        {
            return Some(token.to_string());
        }

        CookieJar::from_headers(request.headers())
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    }

    /// Run the full verification pipeline for one request
    async fn resolve(&self, token: Option<String>) -> Result<Traveller, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        let claims = self.tokens.verify(&token)?;
        let subject = claims.subject()?;

        let traveller = self
            .db
            .find_active_by_id(subject)
            .await?
            .ok_or(AuthError::SubjectGone)?;

        // Freshness: a password change invalidates every earlier token
        // without a server-side revocation list.
        if traveller.password_changed_since(claims.iat) {
            return Err(AuthError::StaleSession);
        }

        debug!("Authenticated traveller: {}", traveller.email);
        Ok(traveller)
    }

    fn reject(&self, error: AuthError) -> Response {
        if self.response_style == ResponseStyle::Browser
            && error.status_code() == StatusCode::UNAUTHORIZED
        {
            return Redirect::to(&self.login_path).into_response();
        }
        error.into_response()
    }
}

/// Hard authentication middleware: the request fails without a valid session
pub async fn require_auth(
    State(gate): State<Arc<SessionGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = SessionGate::extract_token(&request);
    match gate.resolve(token).await {
        Ok(traveller) => {
            request.extensions_mut().insert(CurrentUser(traveller));
            next.run(request).await
        }
        Err(error) => gate.reject(error),
    }
}

/// Soft authentication middleware: anonymous requests pass through
///
/// Any extraction or verification failure simply leaves the request without
/// a `CurrentUser`; handlers that care inspect the extension.
pub async fn maybe_auth(
    State(gate): State<Arc<SessionGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = SessionGate::extract_token(&request);
    if let Ok(traveller) = gate.resolve(token).await {
        request.extensions_mut().insert(CurrentUser(traveller));
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::CredentialHasher;
    use crate::store::{CredentialStore, NewCredential};
    use axum::{Extension, Router, body::Body, http::Request as HttpRequest, routing::get};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    async fn whoami(Extension(CurrentUser(traveller)): Extension<CurrentUser>) -> String {
        traveller.email
    }

    async fn greet(current: Option<Extension<CurrentUser>>) -> String {
        match current {
            Some(Extension(CurrentUser(traveller))) => format!("hello {}", traveller.email),
            None => "hello stranger".to_string(),
        }
    }

    struct Fixture {
        store: CredentialStore,
        tokens: TokenService,
        traveller: Traveller,
        db: Database,
    }

    async fn fixture() -> Fixture {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let hasher = CredentialHasher::new(1024, 1).unwrap();
        let store = CredentialStore::new(db.clone(), hasher, 10);
        let traveller = store
            .signup(NewCredential {
                name: "Test Traveller".to_string(),
                email: "a@example.com".to_string(),
                password: "secret123".to_string(),
                password_confirm: "secret123".to_string(),
                role: None,
            })
            .await
            .unwrap();
        let tokens = TokenService::new("test-secret", 90);
        Fixture { store, tokens, traveller, db }
    }

    fn hard_router(fixture: &Fixture, style: ResponseStyle) -> Router {
        let gate = Arc::new(SessionGate::new(
            fixture.tokens.clone(),
            fixture.db.clone(),
            style,
            "/login",
        ));
        Router::new()
            .route("/me", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(gate, require_auth))
    }

    fn soft_router(fixture: &Fixture) -> Router {
        let gate = Arc::new(SessionGate::new(
            fixture.tokens.clone(),
            fixture.db.clone(),
            ResponseStyle::Api,
            "/login",
        ));
        Router::new()
            .route("/greet", get(greet))
            .route_layer(axum::middleware::from_fn_with_state(gate, maybe_auth))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let fixture = fixture().await;
        let response = hard_router(&fixture, ResponseStyle::Api)
            .oneshot(HttpRequest::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bearer_header_accepted() {
        let fixture = fixture().await;
        let token = fixture.tokens.issue(fixture.traveller.id).unwrap();
        let response = hard_router(&fixture, ResponseStyle::Api)
            .oneshot(
                HttpRequest::get("/me")
                    .header(AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "a@example.com");
    }

    #[tokio::test]
    async fn test_session_cookie_accepted() {
        let fixture = fixture().await;
        let token = fixture.tokens.issue(fixture.traveller.id).unwrap();
        let response = hard_router(&fixture, ResponseStyle::Api)
            .oneshot(
                HttpRequest::get("/me")
                    .header("cookie", format!("{}={}", SESSION_COOKIE, token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let fixture = fixture().await;
        let response = hard_router(&fixture, ResponseStyle::Api)
            .oneshot(
                HttpRequest::get("/me")
                    .header(AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deactivated_subject_is_rejected() {
        let fixture = fixture().await;
        let token = fixture.tokens.issue(fixture.traveller.id).unwrap();
        fixture.store.deactivate(fixture.traveller.id).await.unwrap();

        let response = hard_router(&fixture, ResponseStyle::Api)
            .oneshot(
                HttpRequest::get("/me")
                    .header(AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.contains("no longer exists"));
    }

    #[tokio::test]
    async fn test_stale_session_after_password_change() {
        let fixture = fixture().await;
        let old_token = fixture
            .tokens
            .issue_at(fixture.traveller.id, Utc::now() - Duration::seconds(30))
            .unwrap();

        fixture
            .store
            .change_password(fixture.traveller.id, "secret123", "newsecret1", "newsecret1")
            .await
            .unwrap();

        let router = hard_router(&fixture, ResponseStyle::Api);
        let response = router
            .clone()
            .oneshot(
                HttpRequest::get("/me")
                    .header(AUTHORIZATION, format!("Bearer {}", old_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // A token minted after the change is accepted
        let fresh = fixture.tokens.issue(fixture.traveller.id).unwrap();
        let response = router
            .oneshot(
                HttpRequest::get("/me")
                    .header(AUTHORIZATION, format!("Bearer {}", fresh))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_browser_style_redirects() {
        let fixture = fixture().await;
        let response = hard_router(&fixture, ResponseStyle::Browser)
            .oneshot(HttpRequest::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_soft_gate_passes_anonymous() {
        let fixture = fixture().await;
        let router = soft_router(&fixture);

        let response = router
            .clone()
            .oneshot(HttpRequest::get("/greet").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "hello stranger");

        let token = fixture.tokens.issue(fixture.traveller.id).unwrap();
        let response = router
            .oneshot(
                HttpRequest::get("/greet")
                    .header(AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "hello a@example.com");
    }
}
