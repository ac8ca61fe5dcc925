//! Configuration types for the session hub.
//!
//! A [`HubConfig`] is built once at startup and handed to
//! [`Hub::new`](crate::Hub::new), which validates it before any request is
//! served.
//!
//! # Example
//!
//! ```rust
//! use chrono::Duration;
//! use sessionhub::{CookieConfig, HubConfig, SecurityKey};
//!
//! let config = HubConfig {
//!     cookie: CookieConfig {
//!         name: "shop_session_id".to_owned(),
//!         secure: false,
//!         ..Default::default()
//!     },
//!     session_ttl: Duration::hours(1),
//!     ..HubConfig::new(SecurityKey::new(*b"e9a2f9cbfab74abaa472ff7385dd8224"))
//! };
//!
//! assert!(config.validate().is_ok());
//! ```

use chrono::Duration;

use crate::{SecurityKey, SessionError};

/// Default cookie name when none is configured.
pub const DEFAULT_COOKIE_NAME: &str = "session_id";

/// Default header key when none is configured.
pub const DEFAULT_HEADER_KEY: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    None,
    #[default]
    Lax,
    Strict,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::None => cookie::SameSite::None,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::Strict => cookie::SameSite::Strict,
        }
    }
}

/// Settings for the cookie channel.
///
/// The cookie is always written `HttpOnly`; there is no switch for it.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name. Prefixing it with the project name avoids collisions.
    ///
    /// Default: `session_id`
    pub name: String,

    /// Default: `/`
    pub path: String,

    pub domain: Option<String>,

    /// `Max-Age` attribute. `None` issues a browser-session cookie.
    pub max_age: Option<Duration>,

    /// Default: true
    pub secure: bool,

    /// Default: `Lax`
    pub same_site: SameSite,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_owned(),
            path: "/".to_owned(),
            domain: None,
            max_age: None,
            secure: true,
            same_site: SameSite::Lax,
        }
    }
}

/// Settings for the header channel.
#[derive(Debug, Clone)]
pub struct HeaderConfig {
    /// Request and response header carrying the token.
    ///
    /// Default: `token`
    pub key: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_HEADER_KEY.to_owned(),
        }
    }
}

/// Main configuration for a [`Hub`](crate::Hub).
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Key used by the codec to encrypt store keys into tokens.
    ///
    /// The default AES codec requires exactly 32 bytes.
    pub security_key: SecurityKey,

    pub cookie: CookieConfig,

    pub header: HeaderConfig,

    /// Lifetime of a session record in the store.
    ///
    /// Reads renew the record once less than half of this remains.
    ///
    /// Default: 2 hours
    pub session_ttl: Duration,

    /// Upper bound for every store call. `None` waits as long as the store
    /// client does.
    pub store_timeout: Option<Duration>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            security_key: SecurityKey::default(),
            cookie: CookieConfig::default(),
            header: HeaderConfig::default(),
            session_ttl: Duration::hours(2),
            store_timeout: None,
        }
    }
}

impl HubConfig {
    /// Creates a configuration with default settings and the given key.
    pub fn new(security_key: SecurityKey) -> Self {
        Self {
            security_key,
            ..Default::default()
        }
    }

    /// Checks the settings that do not depend on the codec.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` naming the first invalid field.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.security_key.is_empty() {
            return Err(SessionError::Configuration(
                "security_key must not be empty".to_owned(),
            ));
        }
        if self.cookie.name.is_empty() {
            return Err(SessionError::Configuration(
                "cookie.name must not be empty".to_owned(),
            ));
        }
        if self.header.key.is_empty() {
            return Err(SessionError::Configuration(
                "header.key must not be empty".to_owned(),
            ));
        }
        if http::HeaderName::from_bytes(self.header.key.as_bytes()).is_err() {
            return Err(SessionError::Configuration(format!(
                "header.key {:?} is not a valid header name",
                self.header.key
            )));
        }
        if self.session_ttl <= Duration::zero() {
            return Err(SessionError::Configuration(
                "session_ttl must be positive".to_owned(),
            ));
        }
        if self.store_timeout.is_some_and(|timeout| timeout <= Duration::zero()) {
            return Err(SessionError::Configuration(
                "store_timeout must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
