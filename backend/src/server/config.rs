//! Application settings and the assembled server configuration.

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use renderboard::domain::GuestLimits;
use renderboard::inbound::http::session_config::SessionSecret;
use renderboard::outbound::identity::GoogleCredentials;
use renderboard::outbound::persistence::DbPool;
use serde::Deserialize;
use zeroize::Zeroizing;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

/// Settings loaded from CLI flags, `RENDERBOARD_*` variables, and config
/// files.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RENDERBOARD")]
pub struct AppSettings {
    /// Listen address.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; in-memory adapters are used when absent.
    pub database_url: Option<String>,
    /// Public origin used for share links and the OAuth callback.
    pub public_base_url: Option<String>,
    /// Snapshot directory; snapshots stay in memory when absent.
    pub blob_dir: Option<PathBuf>,
    /// OAuth client id.
    pub oauth_client_id: Option<String>,
    /// OAuth client secret.
    pub oauth_client_secret: Option<String>,
    /// Guest publishes admitted per client per minute.
    pub guest_per_minute: Option<u32>,
    /// Guest publishes admitted per client per day.
    pub guest_per_day: Option<u32>,
    /// Identify guests by `CF-Connecting-IP`; enable only behind the CDN.
    #[ortho_config(default = false)]
    pub trust_cdn_header: bool,
}

impl AppSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns the parse error for a malformed address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
    }

    /// Configured public origin, falling back to the local default.
    pub fn public_base_url(&self) -> &str {
        self.public_base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL)
    }

    /// Guest caps with defaults filled in.
    pub fn guest_limits(&self) -> GuestLimits {
        let defaults = GuestLimits::default();
        GuestLimits {
            per_minute: self.guest_per_minute.unwrap_or(defaults.per_minute),
            per_day: self.guest_per_day.unwrap_or(defaults.per_day),
        }
    }

    /// OAuth registration, present only when both halves are set.
    pub fn oauth_credentials(&self) -> Option<GoogleCredentials> {
        let client_id = self.oauth_client_id.as_deref().map(str::trim)?;
        let client_secret = self.oauth_client_secret.as_deref()?;
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }
        Some(GoogleCredentials {
            client_id: client_id.to_owned(),
            client_secret: Zeroizing::new(client_secret.to_owned()),
        })
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) secret: SessionSecret,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) public_base_url: String,
    pub(crate) guest_limits: GuestLimits,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) blob_dir: Option<PathBuf>,
    pub(crate) oauth: Option<GoogleCredentials>,
    pub(crate) trust_cdn_header: bool,
}

impl ServerConfig {
    /// Construct a configuration with in-memory adapters and OAuth disabled.
    #[must_use]
    pub fn new(secret: SessionSecret, bind_addr: SocketAddr, public_base_url: &str) -> Self {
        Self {
            secret,
            bind_addr,
            public_base_url: public_base_url.to_owned(),
            guest_limits: GuestLimits::default(),
            db_pool: None,
            blob_dir: None,
            oauth: None,
            trust_cdn_header: false,
        }
    }

    /// Attach a database connection pool for the Diesel adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Store snapshots beneath `dir`.
    #[must_use]
    pub fn with_blob_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.blob_dir = dir;
        self
    }

    /// Enable the Google login flow.
    #[must_use]
    pub fn with_oauth(mut self, credentials: Option<GoogleCredentials>) -> Self {
        self.oauth = credentials;
        self
    }

    /// Trust the CDN client header when identifying guests.
    #[must_use]
    pub fn with_trusted_cdn_header(mut self, trusted: bool) -> Self {
        self.trust_cdn_header = trusted;
        self
    }

    /// Override the guest publishing caps.
    #[must_use]
    pub fn with_guest_limits(mut self, limits: GuestLimits) -> Self {
        self.guest_limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 9] = [
        "RENDERBOARD_BIND_ADDR",
        "RENDERBOARD_DATABASE_URL",
        "RENDERBOARD_PUBLIC_BASE_URL",
        "RENDERBOARD_BLOB_DIR",
        "RENDERBOARD_OAUTH_CLIENT_ID",
        "RENDERBOARD_OAUTH_CLIENT_SECRET",
        "RENDERBOARD_GUEST_PER_MINUTE",
        "RENDERBOARD_GUEST_PER_DAY",
        "RENDERBOARD_TRUST_CDN_HEADER",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("renderboard")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default parses"),
            SocketAddr::from(([0, 0, 0, 0], 8080))
        );
        assert_eq!(settings.public_base_url(), DEFAULT_PUBLIC_BASE_URL);
        assert_eq!(settings.guest_limits(), GuestLimits::default());
        assert!(settings.database_url.is_none());
        assert!(settings.blob_dir.is_none());
        assert!(settings.oauth_credentials().is_none());
        assert!(!settings.trust_cdn_header);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("RENDERBOARD_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            ("RENDERBOARD_DATABASE_URL", None),
            (
                "RENDERBOARD_PUBLIC_BASE_URL",
                Some("https://board.example".to_owned()),
            ),
            ("RENDERBOARD_BLOB_DIR", Some("/tmp/renderboard-og".to_owned())),
            ("RENDERBOARD_OAUTH_CLIENT_ID", Some("client".to_owned())),
            ("RENDERBOARD_OAUTH_CLIENT_SECRET", Some("secret".to_owned())),
            ("RENDERBOARD_GUEST_PER_MINUTE", Some("2".to_owned())),
            ("RENDERBOARD_GUEST_PER_DAY", Some("20".to_owned())),
            ("RENDERBOARD_TRUST_CDN_HEADER", Some("true".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("parses"),
            SocketAddr::from(([127, 0, 0, 1], 9000))
        );
        assert_eq!(settings.public_base_url(), "https://board.example");
        assert_eq!(settings.blob_dir, Some(PathBuf::from("/tmp/renderboard-og")));
        assert_eq!(
            settings.guest_limits(),
            GuestLimits {
                per_minute: 2,
                per_day: 20
            }
        );
        let credentials = settings.oauth_credentials().expect("oauth configured");
        assert_eq!(credentials.client_id, "client");
        assert_eq!(credentials.client_secret.as_str(), "secret");
        assert!(settings.trust_cdn_header);
    }

    #[rstest]
    #[case(Some("client"), None)]
    #[case(None, Some("secret"))]
    #[case(Some("  "), Some("secret"))]
    fn partial_oauth_settings_disable_login(
        #[case] client_id: Option<&str>,
        #[case] client_secret: Option<&str>,
    ) {
        let settings = AppSettings {
            bind_addr: None,
            database_url: None,
            public_base_url: None,
            blob_dir: None,
            oauth_client_id: client_id.map(str::to_owned),
            oauth_client_secret: client_secret.map(str::to_owned),
            guest_per_minute: None,
            guest_per_day: None,
            trust_cdn_header: false,
        };
        assert!(settings.oauth_credentials().is_none());
    }
}
