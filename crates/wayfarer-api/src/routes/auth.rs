//! Credential and session routes
//!
//! Signup, login, logout, and the password change/reset flows. Every
//! successful flow answers with a fresh bearer token, both in the body and
//! as an HTTP-only session cookie.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware,
    routing::{get, patch, post},
};
use std::str::FromStr;
use tokio::time::timeout;
use tracing::{debug, warn};
use wayfarer_auth::{CurrentUser, NewCredential, SESSION_COOKIE, require_auth};
use wayfarer_db::{Role, Traveller};

use crate::error::ApiError;
use crate::mailer::MailKind;
use crate::state::AppState;

use super::types::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, ResetPasswordRequest, SessionResponse,
    SignupRequest, UpdatePasswordRequest,
};

// ==================== Session Cookie ====================

/// Render the session cookie header value
///
/// `Secure` is added when a trusted proxy reports TLS termination; the
/// cookie is always HTTP-only so scripts cannot read the token.
fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn connection_is_secure(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("https"))
}

/// Issue a session token and build the common response pieces
fn session_response(
    state: &AppState,
    request_headers: &HeaderMap,
    traveller: &Traveller,
) -> Result<(HeaderMap, Json<SessionResponse>), ApiError> {
    let token = state.tokens.issue(traveller.id)?;
    let expires_in = state.tokens.expires_in_secs();

    let cookie = session_cookie(&token, expires_in, connection_is_secure(request_headers));
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?,
    );

    Ok((
        headers,
        Json(SessionResponse {
            token,
            expires_in,
            traveller: traveller.into(),
        }),
    ))
}

// ==================== Auth Routes ====================

/// POST /api/v1/auth/signup
async fn signup(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SessionResponse>), ApiError> {
    let role = request
        .role
        .as_deref()
        .map(|s| Role::from_str(s).map_err(|_| ApiError::BadRequest(format!("Invalid role: {}", s))))
        .transpose()?;

    let traveller = state
        .store
        .signup(NewCredential {
            name: request.name,
            email: request.email,
            password: request.password,
            password_confirm: request.password_confirm,
            role,
        })
        .await?;

    // Welcome mail is best-effort; signup already succeeded
    let link = format!("{}/api/v1/travellers/me", state.public_url.trim_end_matches('/'));
    let sent = timeout(
        state.mail_timeout,
        state.mailer.send(MailKind::Welcome, &traveller.email, &link),
    )
    .await;
    if !matches!(sent, Ok(Ok(()))) {
        warn!("Welcome mail to {} failed", traveller.email);
    }

    let (headers, body) = session_response(&state, &request_headers, &traveller)?;
    Ok((StatusCode::CREATED, headers, body))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<SessionResponse>), ApiError> {
    let traveller = state.store.authenticate(&request.email, &request.password).await?;
    session_response(&state, &request_headers, &traveller)
}

/// GET /api/v1/auth/logout
///
/// Stateless tokens cannot be revoked individually; logging out overwrites
/// the cookie with a sentinel that expires almost immediately.
async fn logout() -> Result<(HeaderMap, Json<MessageResponse>), ApiError> {
    let cookie = format!("{}=logged-out; Path=/; Max-Age=10; HttpOnly", SESSION_COOKIE);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?,
    );
    Ok((
        headers,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

/// POST /api/v1/auth/forgot-password
///
/// The response waits a bounded time for the mail transport; if delivery
/// fails the stored reset fields are cleared before answering, so the next
/// attempt starts clean.
async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (traveller, token_plaintext) =
        state.store.initiate_password_reset(&request.email).await?;

    let link = format!(
        "{}/api/v1/auth/reset-password/{}",
        state.public_url.trim_end_matches('/'),
        token_plaintext
    );

    let sent = timeout(
        state.mail_timeout,
        state
            .mailer
            .send(MailKind::PasswordReset, &traveller.email, &link),
    )
    .await;

    match sent {
        Ok(Ok(())) => {
            debug!("Reset mail dispatched for {}", traveller.email);
            Ok(Json(MessageResponse {
                message: "Token sent to email".to_string(),
            }))
        }
        Ok(Err(e)) => {
            state.store.abort_password_reset(traveller.id).await?;
            Err(ApiError::MailDelivery(e))
        }
        Err(_) => {
            state.store.abort_password_reset(traveller.id).await?;
            Err(ApiError::Internal("Mail transport timed out".to_string()))
        }
    }
}

/// PATCH /api/v1/auth/reset-password/{token}
async fn reset_password(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    Path(token): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<(HeaderMap, Json<SessionResponse>), ApiError> {
    let traveller = state
        .store
        .complete_password_reset(&token, &request.password, &request.password_confirm)
        .await?;
    session_response(&state, &request_headers, &traveller)
}

/// PATCH /api/v1/auth/update-password (authenticated)
async fn update_password(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    axum::Extension(CurrentUser(current)): axum::Extension<CurrentUser>,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<(HeaderMap, Json<SessionResponse>), ApiError> {
    let traveller = state
        .store
        .change_password(
            current.id,
            &request.password_current,
            &request.password,
            &request.password_confirm,
        )
        .await?;
    session_response(&state, &request_headers, &traveller)
}

/// Create auth routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/v1/auth/update-password", patch(update_password))
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), require_auth));

    Router::new()
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", get(logout))
        .route("/api/v1/auth/forgot-password", post(forgot_password))
        .route("/api/v1/auth/reset-password/{token}", patch(reset_password))
        .merge(protected)
}
