//! Reset-token generation
//!
//! A reset secret is 32 bytes of OS entropy, handed out hex-encoded exactly
//! once for out-of-band delivery. Only its SHA-256 digest is ever stored,
//! so a leaked database row cannot be replayed as a token.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Byte length of the random secret
const RESET_TOKEN_BYTES: usize = 32;

/// A freshly generated reset secret
///
/// `plaintext` goes out-of-band to the account's contact address and is
/// never logged or persisted; `hash` is what the store keeps.
pub struct IssuedReset {
    pub plaintext: String,
    pub hash: String,
}

/// Generate a new high-entropy reset secret
pub fn generate() -> IssuedReset {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let hash = hash_token(&plaintext);
    IssuedReset { plaintext, hash }
}

/// Hash a plaintext reset token into its stored form
pub fn hash_token(plaintext: &str) -> String {
    format!("{:x}", Sha256::digest(plaintext.as_bytes()))
}
