//! Credential store
//!
//! Owns every credential mutation: signup, login verification, password
//! change, and the reset-token lifecycle. All persistence goes through
//! single-statement repository writes, so concurrent flows overwrite
//! rather than accumulate inconsistent state.

use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;
use wayfarer_db::{Database, DbError, NewTraveller, Role, Traveller};

use crate::error::AuthError;
use crate::password::{CredentialHasher, DUMMY_HASH};
use crate::reset;

/// Minimum allowed password length
const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum allowed password length (prevent DoS with very large passwords)
const MAX_PASSWORD_LENGTH: usize = 256;

/// Signup input
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: Option<Role>,
}

/// Credential store over the traveller repository
#[derive(Clone)]
pub struct CredentialStore {
    db: Database,
    hasher: CredentialHasher,
    reset_ttl: Duration,
}

// ==================== Input Validation ====================

/// Normalize an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AuthError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(())
}

fn validate_password_pair(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    if password != confirm {
        return Err(AuthError::Validation(
            "Passwords do not match".to_string(),
        ));
    }
    Ok(())
}

impl CredentialStore {
    pub fn new(db: Database, hasher: CredentialHasher, reset_ttl_minutes: i64) -> Self {
        Self {
            db,
            hasher,
            reset_ttl: Duration::minutes(reset_ttl_minutes),
        }
    }

    /// Create a new traveller account
    ///
    /// The password is hashed before anything is persisted;
    /// `password_changed_at` stays unset because creation is not a change.
    pub async fn signup(&self, new: NewCredential) -> Result<Traveller, AuthError> {
        let email = normalize_email(&new.email);
        validate_email(&email)?;
        validate_password_pair(&new.password, &new.password_confirm)?;
        if new.name.trim().is_empty() {
            return Err(AuthError::Validation("Name cannot be empty".to_string()));
        }

        let password_hash = self.hasher.hash(&new.password)?;

        let traveller = self
            .db
            .insert_traveller(NewTraveller {
                name: new.name.trim().to_string(),
                email,
                password_hash,
                role: new.role.unwrap_or_default(),
            })
            .await
            .map_err(|e| match e {
                DbError::Duplicate(_) => AuthError::Validation(
                    "An account with this email already exists".to_string(),
                ),
                other => AuthError::Database(other),
            })?;

        info!("Traveller {} signed up", traveller.email);
        Ok(traveller)
    }

    /// Verify a login attempt
    ///
    /// Unknown email and wrong password return the same generic error, and
    /// both paths cost one argon2 verification (dummy hash for the former),
    /// so neither the message nor the timing enumerates accounts.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Traveller, AuthError> {
        let email = normalize_email(email);
        debug!("Login attempt for {}", email);

        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AuthError::InvalidCredentials);
        }

        let traveller = self.db.find_active_by_email(&email).await?;

        let (hash_to_verify, traveller) = match traveller {
            Some(t) => (t.password_hash.clone(), Some(t)),
            None => (DUMMY_HASH.to_string(), None),
        };

        let password_valid = self.hasher.verify(password, &hash_to_verify);

        match (traveller, password_valid) {
            (Some(t), true) => {
                info!("Traveller {} logged in", t.email);
                Ok(t)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    /// Change a password for a logged-in traveller
    ///
    /// The current password is re-verified even though the caller already
    /// holds a valid session: a hijacked session on an unattended device
    /// must not be enough to rotate the credential.
    pub async fn change_password(
        &self,
        id: Uuid,
        current: &str,
        new_password: &str,
        new_confirm: &str,
    ) -> Result<Traveller, AuthError> {
        let traveller = self
            .db
            .find_active_by_id(id)
            .await?
            .ok_or(AuthError::SubjectGone)?;

        if !self.hasher.verify(current, &traveller.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        validate_password_pair(new_password, new_confirm)?;
        let password_hash = self.hasher.hash(new_password)?;

        // Back-dated by one second so a session token signed in the same
        // instant as this write still passes the gate's freshness check.
        // Tolerance is one second, not a precise guarantee.
        let changed_at = Utc::now() - Duration::seconds(1);

        if !self.db.update_password(id, &password_hash, changed_at).await? {
            return Err(AuthError::SubjectGone);
        }

        info!("Traveller {} changed password", traveller.email);

        self.db
            .find_active_by_id(id)
            .await?
            .ok_or(AuthError::SubjectGone)
    }

    /// Start a password reset
    ///
    /// Stores only the hash of the secret, with its expiry; a repeat request
    /// overwrites the previous one. The plaintext is returned exactly once
    /// for out-of-band delivery and must not be logged or persisted.
    pub async fn initiate_password_reset(
        &self,
        email: &str,
    ) -> Result<(Traveller, String), AuthError> {
        let email = normalize_email(email);
        let traveller = self
            .db
            .find_active_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::NotFound("No account with that email address".to_string()))?;

        let issued = reset::generate();
        let expires_at = Utc::now() + self.reset_ttl;

        if !self.db.set_reset_token(traveller.id, &issued.hash, expires_at).await? {
            return Err(AuthError::SubjectGone);
        }

        info!("Password reset initiated for {}", traveller.email);
        Ok((traveller, issued.plaintext))
    }

    /// Complete a password reset with the out-of-band secret
    ///
    /// Validation of the new password runs before any lookup or mutation, so
    /// a typo in the confirmation leaves the outstanding token usable. An
    /// expired token is cleared on sight. The success path writes the new
    /// hash and clears the reset pair in one guarded statement; losing a
    /// race to a concurrent consumer reads as an invalid token.
    pub async fn complete_password_reset(
        &self,
        token_plaintext: &str,
        new_password: &str,
        new_confirm: &str,
    ) -> Result<Traveller, AuthError> {
        validate_password_pair(new_password, new_confirm)?;

        let token_hash = reset::hash_token(token_plaintext);
        let traveller = self
            .db
            .find_active_by_reset_hash(&token_hash)
            .await?
            .ok_or(AuthError::ResetTokenInvalid)?;

        let expired = match traveller.reset_token_expires_at {
            Some(expires_at) => expires_at <= Utc::now(),
            // Hash present without expiry violates the pairing invariant;
            // treat it as dead and clean up.
            None => true,
        };
        if expired {
            self.db.clear_reset_token(traveller.id).await?;
            return Err(AuthError::ResetTokenInvalid);
        }

        let password_hash = self.hasher.hash(new_password)?;
        let changed_at = Utc::now() - Duration::seconds(1);

        if !self
            .db
            .consume_reset_token(traveller.id, &token_hash, &password_hash, changed_at)
            .await?
        {
            return Err(AuthError::ResetTokenInvalid);
        }

        info!("Password reset completed for {}", traveller.email);

        self.db
            .find_active_by_id(traveller.id)
            .await?
            .ok_or(AuthError::SubjectGone)
    }

    /// Abandon an outstanding reset, clearing both reset fields
    ///
    /// Called when out-of-band delivery of the secret fails.
    pub async fn abort_password_reset(&self, id: Uuid) -> Result<(), AuthError> {
        self.db.clear_reset_token(id).await?;
        Ok(())
    }

    /// Soft-delete an account
    ///
    /// Already-issued tokens are not revoked here; they die at the gate's
    /// subject-resolution step.
    pub async fn deactivate(&self, id: Uuid) -> Result<(), AuthError> {
        if !self.db.deactivate_traveller(id).await? {
            return Err(AuthError::NotFound(format!("Traveller: {}", id)));
        }
        info!("Traveller {} deactivated", id);
        Ok(())
    }
}
