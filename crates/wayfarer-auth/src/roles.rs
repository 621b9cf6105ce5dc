//! Role-based authorization gate
//!
//! A fixed allow-list bound at router-construction time, checked with a
//! pure method. Must be layered after the authentication gate; it reads
//! the resolved traveller from request extensions and does no I/O.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use wayfarer_db::{Role, Traveller};

use crate::error::AuthError;
use crate::gate::CurrentUser;

/// Per-route role allow-list
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Vec<Role>,
}

impl RoleGate {
    /// Build a gate admitting exactly the given roles
    pub fn allow(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: roles.into_iter().collect(),
        }
    }

    /// Check an authenticated traveller against the allow-list
    pub fn check(&self, traveller: &Traveller) -> Result<(), AuthError> {
        if self.allowed.contains(&traveller.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Authorization middleware over a configured [`RoleGate`]
pub async fn restrict_to(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Response {
    let Some(CurrentUser(traveller)) = request.extensions().get::<CurrentUser>() else {
        // Layered without (or before) the authentication gate
        return AuthError::MissingToken.into_response();
    };

    if let Err(error) = gate.check(traveller) {
        return error.into_response();
    }

    next.run(request).await
}
