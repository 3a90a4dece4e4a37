//! Tamper-evident session tokens.
//!
//! A token is `base64url(json(user)) "." base64url(hmac)`. The base64url
//! alphabet has no `.`, so the delimiter is unambiguous. Tokens are capability
//! assertions: decoding never consults the user table, and there is no
//! server-side revocation list. Rotating the signing secret invalidates every
//! outstanding token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use super::signer::Signer;
use super::user::User;

const DELIMITER: char = '.';

/// Encodes and decodes signed session assertions.
///
/// # Examples
/// ```
/// use renderboard::domain::{SessionCodec, Signer, User, UserId};
///
/// let codec = SessionCodec::new(Signer::new(b"secret").unwrap());
/// let user = User::try_new(UserId::new("42").unwrap(), "google").unwrap();
/// let token = codec.encode(&user).unwrap();
/// assert_eq!(codec.decode(&token), Some(user));
/// assert_eq!(codec.decode("garbage"), None);
/// ```
#[derive(Debug, Clone)]
pub struct SessionCodec {
    signer: Signer,
}

impl SessionCodec {
    /// Build a codec around an already keyed signer.
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Serialise and sign the user claim.
    pub fn encode(&self, user: &User) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(user)?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = self.signer.sign(payload.as_bytes());
        Ok(format!("{payload}{DELIMITER}{signature}"))
    }

    /// Verify and deserialise a token.
    ///
    /// Returns `None` for anything that is not a well-formed token signed
    /// with the current secret. Callers treat `None` exactly like a request
    /// without a cookie.
    pub fn decode(&self, token: &str) -> Option<User> {
        let (payload, signature) = token.split_once(DELIMITER)?;
        if payload.is_empty() || signature.is_empty() {
            return None;
        }
        if !self.signer.verify(payload.as_bytes(), signature) {
            debug!("session signature mismatch");
            return None;
        }
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        match serde_json::from_slice(&json) {
            Ok(user) => Some(user),
            Err(error) => {
                debug!(%error, "signed session payload failed to deserialise");
                None
            }
        }
    }
}
