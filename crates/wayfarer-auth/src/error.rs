//! Authentication error types
//!
//! Every expected failure in the credential flows is a classified variant
//! here; only the `Database` and `Hash` wrappers are unclassified faults.
//! Unclassified detail is logged server-side and never echoed to callers;
//! the responder in `wayfarer-api` can re-attach it in development mode via
//! the [`ErrorDetail`] response extension.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Full internal detail of an unclassified error, stashed in response
/// extensions for the development-mode responder. Production strips it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("You are not logged in")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Password was changed after this token was issued")]
    StaleSession,

    #[error("The account belonging to this token no longer exists")]
    SubjectGone,

    #[error("Token is invalid or has expired")]
    ResetTokenInvalid,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Password hashing error: {0}")]
    Hash(String),

    #[error("Token signing error: {0}")]
    Signing(String),

    #[error("Database error: {0}")]
    Database(#[from] wayfarer_db::DbError),
}

impl AuthError {
    /// True for anticipated failures whose message is safe to surface.
    pub fn is_operational(&self) -> bool {
        !matches!(
            self,
            AuthError::Hash(_) | AuthError::Signing(_) | AuthError::Database(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::ResetTokenInvalid => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::StaleSession
            | AuthError::SubjectGone => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Hash(_) | AuthError::Signing(_) | AuthError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_operational() {
            let body = axum::Json(json!({ "error": self.to_string() }));
            return (status, body).into_response();
        }

        // Unclassified: full detail stays server-side
        error!("Unclassified auth failure: {}", self);
        let body = axum::Json(json!({ "error": "Something went wrong" }));
        let mut response = (status, body).into_response();
        response.extensions_mut().insert(ErrorDetail(self.to_string()));
        response
    }
}
