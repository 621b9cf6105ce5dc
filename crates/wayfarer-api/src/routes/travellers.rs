//! Traveller account and administration routes
//!
//! Everything here sits behind the authentication gate; the administration
//! subset adds a role allow-list on top.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, put},
};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;
use wayfarer_auth::{CurrentUser, RoleGate, require_auth, restrict_to};
use wayfarer_db::Role;

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{TravellerResponse, UpdateRoleRequest};

/// GET /api/v1/travellers/me
async fn me(Extension(CurrentUser(traveller)): Extension<CurrentUser>) -> Json<TravellerResponse> {
    Json((&traveller).into())
}

/// GET /api/v1/travellers (admin, lead-guide)
async fn list_travellers(
    State(state): State<AppState>,
) -> Result<Json<Vec<TravellerResponse>>, ApiError> {
    let travellers = state.db.list_active_travellers().await?;
    Ok(Json(travellers.iter().map(TravellerResponse::from).collect()))
}

/// GET /api/v1/travellers/{id} (admin)
async fn get_traveller(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TravellerResponse>, ApiError> {
    let traveller = state
        .db
        .find_active_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Traveller: {}", id)))?;
    Ok(Json((&traveller).into()))
}

/// PUT /api/v1/travellers/{id}/role (admin)
async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<TravellerResponse>, ApiError> {
    let role = Role::from_str(&request.role)
        .map_err(|_| ApiError::BadRequest(format!("Invalid role: {}", request.role)))?;

    if !state.db.update_role(id, role).await? {
        return Err(ApiError::NotFound(format!("Traveller: {}", id)));
    }

    let traveller = state
        .db
        .find_active_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Traveller: {}", id)))?;

    info!("Role of {} set to {}", traveller.email, role.as_str());
    Ok(Json((&traveller).into()))
}

/// DELETE /api/v1/travellers/{id} (admin)
///
/// Soft delete: already-issued tokens for this account die at the gate's
/// subject-resolution step on their next use.
async fn deactivate_traveller(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create traveller routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let staff = Router::new()
        .route("/api/v1/travellers", get(list_travellers))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::allow([Role::Admin, Role::LeadGuide]),
            restrict_to,
        ));

    let admin = Router::new()
        .route("/api/v1/travellers/{id}", get(get_traveller))
        .route("/api/v1/travellers/{id}", delete(deactivate_traveller))
        .route("/api/v1/travellers/{id}/role", put(update_role))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::allow([Role::Admin]),
            restrict_to,
        ));

    Router::new()
        .route("/api/v1/travellers/me", get(me))
        .merge(staff)
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), require_auth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::LogMailer;
    use crate::routes::create_router;
    use crate::state::Environment;
    use axum::body::Body;
    use axum::http::{Request, header};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use wayfarer_auth::{
        CredentialHasher, CredentialStore, NewCredential, ResponseStyle, SessionGate, TokenService,
    };
    use wayfarer_db::Database;

    struct Fixture {
        app: Router,
        state: AppState,
    }

    async fn fixture() -> Fixture {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let hasher = CredentialHasher::new(1024, 1).unwrap();
        let store = CredentialStore::new(db.clone(), hasher, 10);
        let tokens = TokenService::new("test-secret", 90);
        let gate = Arc::new(SessionGate::new(
            tokens.clone(),
            db.clone(),
            ResponseStyle::Api,
            "/login",
        ));
        let state = AppState::new(
            db,
            store,
            tokens,
            gate,
            Arc::new(LogMailer),
            Environment::Production,
            "http://localhost:5000".to_string(),
            Duration::from_secs(5),
        );
        Fixture {
            app: create_router(state.clone()),
            state,
        }
    }

    /// Create an account with the given role and return (id, bearer token)
    async fn account(fixture: &Fixture, email: &str, role: Option<Role>) -> (Uuid, String) {
        let traveller = fixture
            .state
            .store
            .signup(NewCredential {
                name: "Test Traveller".to_string(),
                email: email.to_string(),
                password: "secret123".to_string(),
                password_confirm: "secret123".to_string(),
                role,
            })
            .await
            .unwrap();
        let token = fixture.state.tokens.issue(traveller.id).unwrap();
        (traveller.id, token)
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_me_requires_auth() {
        let fixture = fixture().await;
        let response = fixture
            .app
            .clone()
            .oneshot(Request::get("/api/v1/travellers/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (_, token) = account(&fixture, "a@example.com", None).await;
        let response = fixture
            .app
            .clone()
            .oneshot(get_with_token("/api/v1/travellers/me", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_listing_is_staff_only() {
        let fixture = fixture().await;
        let (_, user_token) = account(&fixture, "user@example.com", None).await;
        let (_, guide_token) = account(&fixture, "guide@example.com", Some(Role::Guide)).await;
        let (_, lead_token) = account(&fixture, "lead@example.com", Some(Role::LeadGuide)).await;
        let (_, admin_token) = account(&fixture, "admin@example.com", Some(Role::Admin)).await;

        for (token, expected) in [
            (&user_token, StatusCode::FORBIDDEN),
            (&guide_token, StatusCode::FORBIDDEN),
            (&lead_token, StatusCode::OK),
            (&admin_token, StatusCode::OK),
        ] {
            let response = fixture
                .app
                .clone()
                .oneshot(get_with_token("/api/v1/travellers", token))
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_admin_management() {
        let fixture = fixture().await;
        let (user_id, user_token) = account(&fixture, "user@example.com", None).await;
        let (_, lead_token) = account(&fixture, "lead@example.com", Some(Role::LeadGuide)).await;
        let (_, admin_token) = account(&fixture, "admin@example.com", Some(Role::Admin)).await;

        // Lead guides may list, but management is admin-only
        let response = fixture
            .app
            .clone()
            .oneshot(get_with_token(&format!("/api/v1/travellers/{}", user_id), &lead_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = fixture
            .app
            .clone()
            .oneshot(get_with_token(&format!("/api/v1/travellers/{}", user_id), &admin_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Promote the user to guide
        let request = Request::put(format!("/api/v1/travellers/{}/role", user_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({"role": "guide"}).to_string()))
            .unwrap();
        let response = fixture.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Deactivate the account
        let request = Request::delete(format!("/api/v1/travellers/{}", user_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
            .body(Body::empty())
            .unwrap();
        let response = fixture.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // The deactivated account's still-unexpired token is now refused
        let response = fixture
            .app
            .clone()
            .oneshot(get_with_token("/api/v1/travellers/me", &user_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // And the record is gone from lookups
        let response = fixture
            .app
            .clone()
            .oneshot(get_with_token(&format!("/api/v1/travellers/{}", user_id), &admin_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
