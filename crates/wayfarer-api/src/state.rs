//! Application state

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use wayfarer_auth::{CredentialStore, SessionGate, TokenService};
use wayfarer_db::Database;

use crate::mailer::Mailer;

/// Deployment environment
///
/// Controls whether unclassified error detail is exposed in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub store: CredentialStore,
    pub tokens: TokenService,
    pub gate: Arc<SessionGate>,
    pub mailer: Arc<dyn Mailer>,
    pub environment: Environment,
    /// Public base URL, used to build the reset link sent out-of-band
    pub public_url: String,
    /// Bound on how long a response waits for outbound mail
    pub mail_timeout: Duration,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        store: CredentialStore,
        tokens: TokenService,
        gate: Arc<SessionGate>,
        mailer: Arc<dyn Mailer>,
        environment: Environment,
        public_url: String,
        mail_timeout: Duration,
    ) -> Self {
        Self {
            db,
            store,
            tokens,
            gate,
            mailer,
            environment,
            public_url,
            mail_timeout,
        }
    }
}
