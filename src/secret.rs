//! Security key wrapper.
//!
//! Keeps the token encryption key out of logs and debug output.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;

/// Length in bytes of keys produced by [`SecurityKey::temporary`].
pub const TEMPORARY_KEY_LENGTH: usize = 32;

/// The secret shared by every hub in a deployment to encrypt session tokens.
///
/// `SecurityKey` implements `Debug` and `Display` to show `[REDACTED]` instead
/// of the key bytes.
///
/// # Example
///
/// ```rust
/// use sessionhub::SecurityKey;
///
/// let key = SecurityKey::new(*b"e9a2f9cbfab74abaa472ff7385dd8224");
///
/// assert_eq!(format!("{:?}", key), "SecurityKey([REDACTED])");
/// assert_eq!(key.len(), 32);
/// ```
#[derive(Clone, Default)]
pub struct SecurityKey(Vec<u8>);

impl SecurityKey {
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    /// Generates a random key that only lives as long as the process.
    ///
    /// Tokens issued with it become undecodable after a restart. Use it for
    /// demos only; production keys belong in configuration.
    #[must_use]
    pub fn temporary() -> Self {
        log::warn!(
            target: "sessionhub",
            "msg=\"using a temporary security key, do not run this in production\""
        );
        let mut key = vec![0u8; TEMPORARY_KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Exposes the key bytes.
    ///
    /// Only codecs should need this.
    #[must_use]
    pub fn expose_secret(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the length of the key in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for SecurityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityKey([REDACTED])")
    }
}

impl fmt::Display for SecurityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<Vec<u8>> for SecurityKey {
    fn from(key: Vec<u8>) -> Self {
        Self(key)
    }
}

impl From<&str> for SecurityKey {
    fn from(key: &str) -> Self {
        Self(key.as_bytes().to_vec())
    }
}

impl PartialEq for SecurityKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecurityKey {}
