//! Token transports.
//!
//! A channel carries the external token between client and server. It reads
//! from the request headers it was built from and collects the headers the
//! caller must put on the response.

mod cookie;
mod header;

use http::HeaderMap;

use crate::{HubConfig, SessionError};

pub use self::cookie::CookieChannel;
pub use header::HeaderChannel;

/// Read, write and clear the session token on one carrier.
///
/// Methods take `&self`: a channel is shared between the hub and the session
/// it produced, and records writes internally.
pub trait Channel: Send + Sync {
    /// Returns the token sent by the client, or `None` if there is none.
    ///
    /// An absent or empty token is not an error.
    fn read(&self, config: &HubConfig) -> Result<Option<String>, SessionError>;

    /// Hands `token` back to the client. A later write replaces an earlier one.
    fn write(&self, config: &HubConfig, token: &str) -> Result<(), SessionError>;

    /// Makes the client drop its token, where the carrier supports it.
    fn destroy(&self, config: &HubConfig) -> Result<(), SessionError>;

    /// Headers to attach to the outgoing response.
    fn response_headers(&self) -> HeaderMap;
}
