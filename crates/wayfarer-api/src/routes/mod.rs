//! API routes

mod auth;
mod health;
mod travellers;
mod types;

use axum::{Router, middleware};

use crate::error::expose_error_detail;
use crate::state::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness
        .merge(health::routes())
        // Credential and session flows
        .merge(auth::routes(&state))
        // Account and administration surface
        .merge(travellers::routes(&state))
        .with_state(state.clone())
        // Outermost: development-mode error detail
        .layer(middleware::from_fn_with_state(state.environment, expose_error_detail))
}
