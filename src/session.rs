use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use http::HeaderMap;

use crate::events::{HubEvent, prefix};
use crate::{Channel, Hub, SessionError, SessionStore};

/// A resolved session.
///
/// Field access goes straight to the store; nothing is cached on the handle.
/// Reading a field renews the record's TTL once less than half of it is left.
pub struct Session<S: SessionStore> {
    id: String,
    store_key: String,
    hub: Hub<S>,
    channel: Option<Arc<dyn Channel>>,
}

impl<S: SessionStore> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &format_args!("{}...", prefix(&self.id)))
            .field("store_key", &"[REDACTED]")
            .field("has_channel", &self.channel.is_some())
            .finish()
    }
}

impl<S: SessionStore> Session<S> {
    pub(crate) fn new(
        hub: Hub<S>,
        id: String,
        store_key: String,
        channel: Option<Arc<dyn Channel>>,
    ) -> Self {
        Self {
            id,
            store_key,
            hub,
            channel,
        }
    }

    /// The external token. Safe to hand to the client.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads a field, renewing the record's TTL when it runs low.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_get", skip_all, err))]
    pub async fn get(&self, field: &str) -> Result<Option<String>, SessionError> {
        self.renew_if_due().await?;
        let store = self.hub.store();
        self.hub.call(store.get(&self.store_key, field)).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "session_set", skip_all, err))]
    pub async fn set(&self, field: &str, value: &str) -> Result<(), SessionError> {
        let store = self.hub.store();
        self.hub.call(store.set(&self.store_key, field, value)).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_delete", skip_all, err)
    )]
    pub async fn delete(&self, field: &str) -> Result<(), SessionError> {
        let store = self.hub.store();
        self.hub.call(store.delete(&self.store_key, field)).await
    }

    /// Time left before the record expires, or `None` if it has no expiry.
    pub async fn remaining_ttl(&self) -> Result<Option<Duration>, SessionError> {
        let store = self.hub.store();
        self.hub.call(store.remaining_ttl(&self.store_key)).await
    }

    /// Ends the session on the client and in the store.
    ///
    /// The channel is cleared first. If that fails the record is left in
    /// place and the error returned, so a retry can still find it. Call
    /// [`Session::response_headers`] afterwards to send the removal cookie.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_destroy", skip_all, err)
    )]
    pub async fn destroy(&self) -> Result<(), SessionError> {
        if let Some(channel) = &self.channel {
            channel.destroy(self.hub.config())?;
        }

        let store = self.hub.store();
        self.hub.call(store.destroy(&self.store_key)).await?;

        log::info!(
            target: "sessionhub::session",
            "msg=\"session destroyed\" token_prefix=\"{}\"",
            prefix(&self.id)
        );
        self.hub.emit(HubEvent::SessionDestroyed { at: Utc::now() });
        Ok(())
    }

    /// Headers the caller must attach to the response, e.g. `Set-Cookie`.
    ///
    /// Empty for sessions looked up with [`Hub::session_by_id`].
    pub fn response_headers(&self) -> HeaderMap {
        self.channel
            .as_ref()
            .map(|channel| channel.response_headers())
            .unwrap_or_default()
    }

    async fn renew_if_due(&self) -> Result<(), SessionError> {
        let store = self.hub.store();
        let ttl = self.hub.config().session_ttl;

        let remaining = self.hub.call(store.remaining_ttl(&self.store_key)).await?;
        if remaining.is_some_and(|left| left >= ttl / 2) {
            return Ok(());
        }

        log::debug!(
            target: "sessionhub::session",
            "msg=\"renewing session ttl\" token_prefix=\"{}\"",
            prefix(&self.id)
        );
        self.hub.call(store.renew_ttl(&self.store_key, ttl)).await
    }
}
