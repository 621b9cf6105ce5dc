//! Wayfarer Authentication and Authorization
//!
//! This crate owns the credential and session lifecycle for Wayfarer:
//! password hashing, bearer-token issue/verify, the credential store
//! (signup, login, password change and reset), and the axum middleware
//! gates for authentication and role-based access control.

pub mod error;
pub mod gate;
pub mod password;
pub mod reset;
pub mod roles;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use gate::{CurrentUser, ResponseStyle, SESSION_COOKIE, SessionGate, maybe_auth, require_auth};
pub use password::CredentialHasher;
pub use roles::{RoleGate, restrict_to};
pub use store::{CredentialStore, NewCredential};
pub use token::{Claims, TokenService};
