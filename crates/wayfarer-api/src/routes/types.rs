//! Request/Response DTOs

use serde::{Deserialize, Serialize};
use wayfarer_db::Traveller;

// ==================== Auth Types ====================

/// Signup request
#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Forgot-password request
#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset-password request (the token travels in the path)
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

/// Password-change request for a logged-in traveller
#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

/// Session response: a fresh token plus the sanitized record
#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_in: i64,
    pub traveller: TravellerResponse,
}

/// Generic status message
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ==================== Traveller Types ====================

/// Role-change request
#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Traveller response (credential fields stripped)
#[derive(Serialize)]
pub struct TravellerResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Traveller> for TravellerResponse {
    fn from(traveller: &Traveller) -> Self {
        Self {
            id: traveller.id.to_string(),
            name: traveller.name.clone(),
            email: traveller.email.clone(),
            role: traveller.role.as_str().to_string(),
            created_at: traveller.created_at.to_rfc3339(),
            updated_at: traveller.updated_at.to_rfc3339(),
        }
    }
}
