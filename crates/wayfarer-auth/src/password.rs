//! Password hashing
//!
//! Argon2id with a fresh random salt per hash. The work factor comes from
//! configuration; because the parameters are embedded in the PHC output,
//! raising them later never invalidates hashes already on disk.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AuthError;

/// A structurally valid argon2id hash that matches no password.
///
/// Verified against when a login names an unknown email, so both failure
/// paths cost one argon2 verification.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$cmVzZXQtZHVtbXktc2FsdA$AAAAAAAAAAAAAAAAAAAAAA";

/// Argon2id hasher with a configured work factor
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Create a hasher with the given memory cost (KiB) and iteration count
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt
    ///
    /// Two calls with the same input produce different strings.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string())
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// Returns `false` on mismatch and on malformed hashes; attacker-supplied
    /// input can never make this panic or error. The comparison inside the
    /// argon2 crate is constant-time.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters; production values come from config.
    fn hasher() -> CredentialHasher {
        CredentialHasher::new(1024, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse battery staple").unwrap();
        assert!(hasher.verify("correct horse battery staple", &hash));
        assert!(!hasher.verify("correct horse battery stable", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let a = hasher.hash("secret123").unwrap();
        let b = hasher.hash("secret123").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("secret123", &a));
        assert!(hasher.verify("secret123", &b));
    }

    #[test]
    fn test_verify_malformed_hash_is_false() {
        let hasher = hasher();
        assert!(!hasher.verify("anything", ""));
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", "$argon2id$garbage"));
    }

    #[test]
    fn test_dummy_hash_matches_nothing() {
        let hasher = hasher();
        assert!(!hasher.verify("", DUMMY_HASH));
        assert!(!hasher.verify("admin", DUMMY_HASH));
    }

    #[test]
    fn test_work_factor_change_keeps_old_hashes_valid() {
        let old = CredentialHasher::new(1024, 1).unwrap();
        let hash = old.hash("secret123").unwrap();

        // A hasher with doubled parameters still verifies the old hash,
        // because verification reads the parameters from the hash itself.
        let new = CredentialHasher::new(2048, 2).unwrap();
        assert!(new.verify("secret123", &hash));
    }
}
