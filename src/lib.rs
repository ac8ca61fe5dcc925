//! Encrypted, self-healing session tokens backed by a TTL key-value store.
//!
//! A [`Hub`] reads an opaque token from a [`Channel`] (cookie or header),
//! decrypts it into a server-side store key, verifies the record still exists
//! and hands back a [`Session`]. Missing tokens are minted and expired records
//! are re-issued transparently; forged tokens are rejected.
//!
//! # Example
//!
//! ```rust,ignore
//! use sessionhub::{Hub, HubConfig, InMemorySessionStore, SecurityKey};
//!
//! let config = HubConfig::new(SecurityKey::new(*b"e9a2f9cbfab74abaa472ff7385dd8224"));
//! let hub = Hub::new(InMemorySessionStore::new(), config)?;
//!
//! let session = hub.resolve_cookie(request.headers()).await?;
//! session.set("name", "nimo").await?;
//! response.headers_mut().extend(session.response_headers());
//! ```

pub mod channel;
pub mod config;
pub mod crypto;
pub mod events;
mod hub;
mod secret;
mod session;
pub mod store;

use std::fmt;

pub use channel::{Channel, CookieChannel, HeaderChannel};
pub use config::{CookieConfig, HeaderConfig, HubConfig, SameSite};
pub use crypto::{AesCbcCodec, Codec};
pub use events::{HubEvent, Listener};
pub use hub::{Hub, HubBuilder};
pub use secret::SecurityKey;
pub use session::Session;
#[cfg(feature = "redis")]
pub use store::RedisSessionStore;
pub use store::{InMemorySessionStore, SessionStore};

/// Coarse classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid settings. Never worth retrying.
    Configuration,
    /// The backing store failed or timed out.
    Transport,
    /// The client presented a token that does not decode.
    Tamper,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Configuration(String),
    Channel(String),
    Store(String),
    Timeout,
    TokenTampered(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Configuration(_) | SessionError::Channel(_) => ErrorKind::Configuration,
            SessionError::Store(_) | SessionError::Timeout => ErrorKind::Transport,
            SessionError::TokenTampered(_) => ErrorKind::Tamper,
        }
    }

    /// Returns true if the error points at a forged or corrupted token.
    pub fn is_tampered(&self) -> bool {
        self.kind() == ErrorKind::Tamper
    }
}

impl std::error::Error for SessionError {}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SessionError::Channel(msg) => write!(f, "Channel error: {}", msg),
            SessionError::Store(msg) => write!(f, "Store error: {}", msg),
            SessionError::Timeout => write!(f, "Store operation timed out"),
            SessionError::TokenTampered(msg) => write!(f, "Invalid session token: {}", msg),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Store(err.to_string())
    }
}
