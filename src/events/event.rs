use chrono::{DateTime, Utc};

/// Notable transitions of the session resolution protocol.
///
/// Fired by the [`Hub`](crate::Hub) and [`Session`](crate::Session) to every
/// listener registered on the hub. With no listeners they cost nothing.
#[derive(Debug, Clone)]
pub enum HubEvent {
    /// A new token and store record were minted.
    SessionIssued { at: DateTime<Utc> },

    /// A token decrypted fine but its store record is gone.
    ///
    /// Usually plain expiry. A burst of these may also mean someone replays
    /// old tokens.
    StoreKeyMissing {
        session_id: String,
        store_key: String,
        at: DateTime<Utc>,
    },

    /// A lookup by id was attempted with an empty string.
    EmptyToken { at: DateTime<Utc> },

    /// A token failed to decode and the request was refused.
    TokenRejected { reason: String, at: DateTime<Utc> },

    SessionDestroyed { at: DateTime<Utc> },
}

impl HubEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionIssued { .. } => "session.issued",
            Self::StoreKeyMissing { .. } => "session.store_key_missing",
            Self::EmptyToken { .. } => "session.token.empty",
            Self::TokenRejected { .. } => "session.token.rejected",
            Self::SessionDestroyed { .. } => "session.destroyed",
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SessionIssued { at }
            | Self::StoreKeyMissing { at, .. }
            | Self::EmptyToken { at }
            | Self::TokenRejected { at, .. }
            | Self::SessionDestroyed { at } => *at,
        }
    }

    /// Short, log-safe description of the event payload.
    ///
    /// Never contains a full token or store key.
    pub fn summary(&self) -> String {
        match self {
            Self::StoreKeyMissing { session_id, .. } => {
                format!("token_prefix=\"{}\"", prefix(session_id))
            }
            Self::TokenRejected { reason, .. } => format!("reason=\"{reason}\""),
            Self::SessionIssued { .. } | Self::EmptyToken { .. } | Self::SessionDestroyed { .. } => {
                String::new()
            }
        }
    }
}

pub(crate) fn prefix(value: &str) -> String {
    value.chars().take(8).collect()
}
