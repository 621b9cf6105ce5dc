//! Wayfarer REST API
//!
//! This crate provides the Axum-based HTTP API for Wayfarer: the
//! credential and session flows, the traveller account surface, and the
//! error responder.

pub mod error;
pub mod mailer;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use mailer::{LogMailer, MailKind, Mailer};
pub use routes::create_router;
pub use state::{AppState, Environment};
