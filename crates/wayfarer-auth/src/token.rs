//! Bearer-token management
//!
//! Stateless HS256 tokens carrying only the subject id and the issue/expiry
//! timestamps. Validity is signature + expiry here; the freshness
//! cross-check against `password_changed_at` happens in the gate.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;

/// Bearer-token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (traveller ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into a traveller id
    pub fn subject(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// Token service for session-token issue and verification
///
/// The signing secret is process-wide configuration loaded once at startup;
/// swapping it means constructing a new service, not changing code.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Create a new token service
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Session lifetime in seconds, for cookie expiry and response bodies
    pub fn expires_in_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a signed token for a traveller
    pub fn issue(&self, subject: Uuid) -> Result<String, AuthError> {
        self.issue_at(subject, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        debug!("Issuing session token for traveller: {}", subject);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a token and return its claims
    ///
    /// Failures are classified: a good signature past its expiry is
    /// `TokenExpired`; bad signatures and unparseable input are
    /// `InvalidToken`. Adversarial input never panics.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        // No leeway: the expiry boundary is exact. Write-then-sign races
        // around password changes are absorbed by the store's back-dation,
        // not by loosening verification.
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;

        Ok(token_data.claims)
    }
}
