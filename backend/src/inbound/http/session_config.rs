//! Session secret loading and validation.
//!
//! The secret keys every session cookie and rate-limit bucket, so it is read
//! once at startup from a mounted file and never logged.

use std::path::PathBuf;

use mockable::Env;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;
use zeroize::Zeroizing;

const SESSION_SECRET_DEFAULT_PATH: &str = "/var/run/secrets/session_secret";
const SESSION_SECRET_MIN_LEN: usize = 32;
const EPHEMERAL_SECRET_LEN: usize = 64;
const SECRET_FILE_ENV: &str = "SESSION_SECRET_FILE";
const ALLOW_EPHEMERAL_ENV: &str = "SESSION_ALLOW_EPHEMERAL";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";

/// Build mode for secret validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds fall back to an ephemeral secret.
    Debug,
    /// Release builds require a readable, sufficiently long secret.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Secret bytes, wiped on drop.
pub struct SessionSecret {
    bytes: Zeroizing<Vec<u8>>,
    ephemeral: bool,
}

impl SessionSecret {
    /// Raw secret bytes for keying a signer.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the secret was generated for this process only.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// Errors raised while loading the session secret.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Reading the secret file failed.
    #[error("failed to read session secret at {path}: {source}")]
    SecretRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The secret file is empty.
    #[error("session secret at {path} is empty")]
    SecretEmpty { path: PathBuf },
    /// The secret file is too short for release builds.
    #[error("session secret at {path} too short: need >= {min_len} bytes, got {length}")]
    SecretTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

/// Load the session secret named by `SESSION_SECRET_FILE`.
///
/// # Errors
///
/// Fails when the file is unreadable and no ephemeral fallback is allowed,
/// when the file is empty, or when a release build finds it too short.
pub fn session_secret_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SessionSecret, SessionConfigError> {
    let allow_ephemeral = allow_ephemeral_from_env(env)?;
    let path = PathBuf::from(
        env.string(SECRET_FILE_ENV)
            .unwrap_or_else(|| SESSION_SECRET_DEFAULT_PATH.to_owned()),
    );

    match std::fs::read(&path) {
        Ok(bytes) => {
            let bytes = Zeroizing::new(bytes);
            let length = bytes.len();
            if length == 0 {
                return Err(SessionConfigError::SecretEmpty { path });
            }
            if mode == BuildMode::Release && length < SESSION_SECRET_MIN_LEN {
                return Err(SessionConfigError::SecretTooShort {
                    path,
                    length,
                    min_len: SESSION_SECRET_MIN_LEN,
                });
            }
            Ok(SessionSecret {
                bytes,
                ephemeral: false,
            })
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using ephemeral session secret; sessions end on restart"
            );
            Ok(ephemeral_secret())
        }
        Err(error) => Err(SessionConfigError::SecretRead {
            path,
            source: error,
        }),
    }
}

fn ephemeral_secret() -> SessionSecret {
    let mut bytes = Zeroizing::new(vec![0_u8; EPHEMERAL_SECRET_LEN]);
    OsRng.fill_bytes(&mut bytes);
    SessionSecret {
        bytes,
        ephemeral: true,
    }
}

fn allow_ephemeral_from_env<E: Env>(env: &E) -> Result<bool, SessionConfigError> {
    let Some(value) = env.string(ALLOW_EPHEMERAL_ENV) else {
        return Ok(false);
    };
    parse_bool(&value).ok_or(SessionConfigError::InvalidEnv {
        name: ALLOW_EPHEMERAL_ENV,
        value,
        expected: BOOL_EXPECTED,
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
