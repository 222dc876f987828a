//! Possession-token generation and verification using Argon2
//!
//! Tokens are 24 random bytes rendered as unpadded URL-safe base64. The
//! registry keeps the argon2id PHC string, never the token itself.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::sync::OnceLock;

use crate::types::GatewayError;

/// Entropy of a possession token
pub const POSSESSION_TOKEN_BYTES: usize = 24;

/// Create a fresh possession token
pub fn generate_possession_token() -> String {
    let mut bytes = [0u8; POSSESSION_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a possession token for storage
pub fn hash_possession_token(token: &str) -> Result<String, GatewayError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(token.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatewayError::Internal(format!("Failed to hash possession token: {e}")))
}

/// Check a presented token against the stored hash.
///
/// `None` for the stored hash (unknown provider) still runs a full Argon2
/// verification against a throwaway hash, so both failure paths cost the same.
pub fn verify_possession_token(token: &str, stored_hash: Option<&str>) -> Result<bool, GatewayError> {
    match stored_hash {
        Some(hash) => {
            let parsed = PasswordHash::new(hash).map_err(|e| {
                GatewayError::Internal(format!("Invalid possession hash format: {e}"))
            })?;
            Ok(Argon2::default()
                .verify_password(token.as_bytes(), &parsed)
                .is_ok())
        }
        None => {
            let decoy = decoy_hash()?;
            let parsed = PasswordHash::new(decoy).map_err(|e| {
                GatewayError::Internal(format!("Invalid decoy hash format: {e}"))
            })?;
            let _ = Argon2::default().verify_password(token.as_bytes(), &parsed);
            Ok(false)
        }
    }
}

fn decoy_hash() -> Result<&'static str, GatewayError> {
    static DECOY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DECOY.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_possession_token(&generate_possession_token())?;
    Ok(DECOY.get_or_init(|| hash).as_str())
}
