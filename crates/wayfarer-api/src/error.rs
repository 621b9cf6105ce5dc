//! API error types

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use wayfarer_auth::error::ErrorDetail;

use crate::mailer::MailError;
use crate::state::Environment;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("There was an error sending the email. Try again later")]
    MailDelivery(#[from] MailError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Auth(#[from] wayfarer_auth::AuthError),

    #[error("Database error: {0}")]
    Database(#[from] wayfarer_db::DbError),
}

fn json_error(status: StatusCode, message: &str) -> Response {
    let body = axum::Json(json!({ "error": message }));
    (status, body).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Classified auth failures carry their own status mapping
            ApiError::Auth(e) => e.into_response(),
            ApiError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, &msg),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, &msg),
            ApiError::MailDelivery(e) => {
                error!("Outbound mail failed: {}", e);
                json_error(
                    StatusCode::BAD_GATEWAY,
                    "There was an error sending the email. Try again later",
                )
            }
            other @ (ApiError::Internal(_) | ApiError::Database(_)) => {
                // Unclassified: full detail stays server-side
                error!("Unclassified failure: {}", other);
                let mut response =
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong");
                response.extensions_mut().insert(ErrorDetail(other.to_string()));
                response
            }
        }
    }
}

/// Development responder: re-attach unclassified error detail
///
/// `IntoResponse` always answers generically for unclassified faults and
/// stashes the detail in response extensions; this outermost layer rebuilds
/// the body with the detail included when the environment allows it.
/// Production never reaches the rebuild, so nothing leaks by default.
pub async fn expose_error_detail(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if environment != Environment::Development {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let status = response.status();
    let body = axum::Json(json!({ "error": "Something went wrong", "detail": detail }));
    (status, body).into_response()
}
