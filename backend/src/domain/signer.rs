//! Keyed signing primitive shared by session tokens and rate-limit keys.
//!
//! Signatures are HMAC-SHA-256 tags encoded as unpadded base64url, so they
//! never contain `.` and can be concatenated with other base64url segments.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of an encoded signature in characters.
pub const SIGNATURE_LEN: usize = 43;

/// Configuration faults raised when building a [`Signer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The signing secret was empty.
    #[error("signing secret must not be empty")]
    EmptySecret,
    /// The MAC implementation rejected the key.
    #[error("signing secret rejected: {message}")]
    InvalidKey { message: String },
}

/// Stateless HMAC signer bound to one secret.
///
/// # Examples
/// ```
/// use renderboard::domain::Signer;
///
/// let signer = Signer::new(b"top secret".to_vec()).expect("non-empty secret");
/// let signature = signer.sign(b"payload");
/// assert!(signer.verify(b"payload", &signature));
/// assert!(!signer.verify(b"other", &signature));
/// ```
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    /// Key a signer with `secret`.
    ///
    /// The secret bytes are only used to seed the MAC state; callers keep
    /// ownership of zeroisation for their own copy.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SignerError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|err| SignerError::InvalidKey {
            message: err.to_string(),
        })?;
        Ok(Self { mac })
    }

    /// Sign `payload`, returning a fixed-length base64url tag.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Recompute the tag for `payload` and compare it in constant time.
    ///
    /// Malformed signatures simply fail verification.
    #[must_use]
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}
