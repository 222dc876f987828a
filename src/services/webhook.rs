//! Inbound webhook authentication
//!
//! The vendor sends `x-payload-digest` (hex HMAC of the raw body keyed by the
//! webhook secret) and `x-payload-digest-alg` naming the hash. Digests are
//! compared in constant time.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Digest header
pub const DIGEST_HEADER: &str = "x-payload-digest";

/// Algorithm hint header
pub const DIGEST_ALG_HEADER: &str = "x-payload-digest-alg";

/// Hash used for the payload digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Pick the algorithm from the header hint
    ///
    /// Any hint mentioning sha512 (case-insensitive) selects SHA-512;
    /// everything else, including no hint, selects SHA-256.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint {
            Some(h) if h.to_ascii_lowercase().contains("sha512") => Self::Sha512,
            _ => Self::Sha256,
        }
    }

    fn digest_hex(self, secret: &[u8], body: &[u8]) -> Option<String> {
        let bytes = match self {
            Self::Sha256 => {
                let mut mac = HmacSha256::new_from_slice(secret).ok()?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
            Self::Sha512 => {
                let mut mac = HmacSha512::new_from_slice(secret).ok()?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
        };
        Some(hex::encode(bytes))
    }
}

/// Check a payload digest against the raw body
///
/// The digest must equal the lowercase hex HMAC byte for byte. Returns false
/// for an empty secret or an empty digest.
pub fn verify(body: &[u8], digest_hex: &str, algorithm_hint: Option<&str>, secret: &[u8]) -> bool {
    if secret.is_empty() || digest_hex.is_empty() {
        return false;
    }

    let Some(expected) = DigestAlgorithm::from_hint(algorithm_hint).digest_hex(secret, body) else {
        return false;
    };

    expected.as_bytes().ct_eq(digest_hex.as_bytes()).into()
}

/// Webhook verifier holding the shared secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Zeroizing<String>,
}

impl WebhookVerifier {
    pub fn new(secret: Zeroizing<String>) -> Self {
        Self { secret }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn verify(&self, body: &[u8], digest_hex: &str, algorithm_hint: Option<&str>) -> bool {
        verify(body, digest_hex, algorithm_hint, self.secret.as_bytes())
    }
}
