use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use http::HeaderMap;

use crate::crypto::{generate_store_key, is_store_key};
use crate::events::{HubEvent, Listener, prefix};
use crate::{
    AesCbcCodec, Channel, Codec, CookieChannel, HeaderChannel, HubConfig, Session, SessionError,
    SessionStore,
};

struct HubInner<S> {
    store: S,
    config: HubConfig,
    codec: Box<dyn Codec>,
    listeners: Vec<Box<dyn Listener>>,
    store_timeout: Option<std::time::Duration>,
}

/// Issues, resolves and heals sessions.
///
/// Build one per process and share it; cloning is cheap. Resolution never
/// takes an in-process lock, so concurrent requests only contend inside the
/// store.
pub struct Hub<S: SessionStore> {
    inner: Arc<HubInner<S>>,
}

impl<S: SessionStore> std::fmt::Debug for Hub<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").finish_non_exhaustive()
    }
}

impl<S: SessionStore> Clone for Hub<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for a [`Hub`] with a custom codec or listeners.
pub struct HubBuilder<S: SessionStore> {
    store: S,
    config: HubConfig,
    codec: Box<dyn Codec>,
    listeners: Vec<Box<dyn Listener>>,
}

impl<S: SessionStore> HubBuilder<S> {
    /// Replaces the default [`AesCbcCodec`].
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Registers a listener. Listeners are called in registration order.
    pub fn listener(mut self, listener: impl Listener) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Validates the configuration and builds the hub.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if a setting is invalid or the
    /// security key does not suit the codec.
    pub fn build(self) -> Result<Hub<S>, SessionError> {
        self.config.validate()?;
        self.codec.validate_key(&self.config.security_key)?;

        let store_timeout = self
            .config
            .store_timeout
            .map(|timeout| timeout.to_std())
            .transpose()
            .map_err(|_| SessionError::Configuration("store_timeout out of range".to_owned()))?;

        Ok(Hub {
            inner: Arc::new(HubInner {
                store: self.store,
                config: self.config,
                codec: self.codec,
                listeners: self.listeners,
                store_timeout,
            }),
        })
    }
}

impl<S: SessionStore> Hub<S> {
    /// Creates a hub with the default codec and no listeners.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the configuration is invalid,
    /// e.g. the security key is not 32 bytes.
    pub fn new(store: S, config: HubConfig) -> Result<Self, SessionError> {
        Self::builder(store, config).build()
    }

    pub fn builder(store: S, config: HubConfig) -> HubBuilder<S> {
        HubBuilder {
            store,
            config,
            codec: Box::new(AesCbcCodec),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Issues a new session and returns its token.
    ///
    /// Apps that carry the token in a body rather than a cookie call this at
    /// login and hand the token to the client themselves.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "new_session_id", skip_all, err)
    )]
    pub async fn new_session_id(&self) -> Result<String, SessionError> {
        let (token, _) = self.mint().await?;
        Ok(token)
    }

    /// Resolves the session carried by `channel`, minting or re-issuing one
    /// when needed.
    ///
    /// - no token: a new session is issued and written to the channel
    /// - token that does not decode: `SessionError::TokenTampered`
    /// - token whose record is gone: a new session is issued and written to
    ///   the channel, without error
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "resolve", skip_all, err))]
    pub async fn resolve(&self, channel: Arc<dyn Channel>) -> Result<Session<S>, SessionError> {
        let config = &self.inner.config;

        let Some(token) = channel.read(config)? else {
            let (token, store_key) = self.mint().await?;
            channel.write(config, &token)?;
            return Ok(Session::new(self.clone(), token, store_key, Some(channel)));
        };

        let store_key = self.decode(&token)?;
        if self.call(self.inner.store.exists(&store_key)).await? {
            return Ok(Session::new(self.clone(), token, store_key, Some(channel)));
        }

        log::info!(
            target: "sessionhub::hub",
            "msg=\"session record missing, re-issuing\" token_prefix=\"{}\"",
            prefix(&token)
        );
        self.emit(HubEvent::StoreKeyMissing {
            session_id: token,
            store_key,
            at: Utc::now(),
        });

        let (token, store_key) = self.mint().await?;
        channel.write(config, &token)?;
        Ok(Session::new(self.clone(), token, store_key, Some(channel)))
    }

    /// Resolves the session from the request's cookie.
    ///
    /// Attach [`Session::response_headers`] to the response afterwards.
    pub async fn resolve_cookie(&self, headers: &HeaderMap) -> Result<Session<S>, SessionError> {
        self.resolve(Arc::new(CookieChannel::from_headers(headers)))
            .await
    }

    /// Resolves the session from the configured request header.
    ///
    /// Attach [`Session::response_headers`] to the response afterwards.
    pub async fn resolve_header(&self, headers: &HeaderMap) -> Result<Session<S>, SessionError> {
        self.resolve(Arc::new(HeaderChannel::from_headers(headers)))
            .await
    }

    /// Looks a session up by token without a channel and without healing.
    ///
    /// Returns `Ok(None)` when the token is empty or its record is gone; the
    /// caller should ask the client to obtain a new session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TokenTampered` if the token does not decode.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "session_by_id", skip_all, err)
    )]
    pub async fn session_by_id(&self, session_id: &str) -> Result<Option<Session<S>>, SessionError> {
        if session_id.is_empty() {
            self.emit(HubEvent::EmptyToken { at: Utc::now() });
            return Ok(None);
        }

        let store_key = self.decode(session_id)?;
        if !self.call(self.inner.store.exists(&store_key)).await? {
            self.emit(HubEvent::StoreKeyMissing {
                session_id: session_id.to_owned(),
                store_key,
                at: Utc::now(),
            });
            return Ok(None);
        }

        Ok(Some(Session::new(
            self.clone(),
            session_id.to_owned(),
            store_key,
            None,
        )))
    }

    async fn mint(&self) -> Result<(String, String), SessionError> {
        let inner = &self.inner;
        let store_key = generate_store_key();
        let token = inner.codec.encrypt(&store_key, &inner.config.security_key)?;
        let round_trip = inner.codec.decrypt(&token, &inner.config.security_key);
        if round_trip.as_deref() != Ok(store_key.as_str()) {
            return Err(SessionError::Configuration(
                "codec does not decrypt its own tokens".to_owned(),
            ));
        }

        self.call(inner.store.init_session(&store_key, inner.config.session_ttl))
            .await?;

        log::debug!(target: "sessionhub::hub", "msg=\"session issued\"");
        self.emit(HubEvent::SessionIssued { at: Utc::now() });

        Ok((token, store_key))
    }

    fn decode(&self, token: &str) -> Result<String, SessionError> {
        let inner = &self.inner;
        let decoded = inner
            .codec
            .decrypt(token, &inner.config.security_key)
            .and_then(|store_key| {
                if is_store_key(&store_key) {
                    Ok(store_key)
                } else {
                    Err(SessionError::TokenTampered(
                        "decrypted value is not a store key".to_owned(),
                    ))
                }
            });

        if let Err(SessionError::TokenTampered(reason)) = &decoded {
            log::warn!(
                target: "sessionhub::hub",
                "msg=\"session token rejected\" reason=\"{}\" token_prefix=\"{}...\"",
                reason,
                prefix(token)
            );
            self.emit(HubEvent::TokenRejected {
                reason: reason.clone(),
                at: Utc::now(),
            });
        }

        decoded
    }

    /// Runs a store operation under the configured timeout.
    pub(crate) async fn call<T>(
        &self,
        operation: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        let Some(limit) = self.inner.store_timeout else {
            return operation.await;
        };

        match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    target: "sessionhub::hub",
                    "msg=\"store operation timed out\" timeout_ms={}",
                    limit.as_millis()
                );
                Err(SessionError::Timeout)
            }
        }
    }

    /// Runs every listener. A listener that panics is logged and skipped.
    pub(crate) fn emit(&self, event: HubEvent) {
        for listener in &self.inner.listeners {
            let handled = panic::catch_unwind(AssertUnwindSafe(|| listener.handle(&event)));
            if handled.is_err() {
                log::error!(
                    target: "sessionhub::hub",
                    "msg=\"listener panicked\" event=\"{}\"",
                    event.name()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Duration;

    use super::*;
    use crate::{InMemorySessionStore, SecurityKey};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl Listener for Recorder {
        fn handle(&self, event: &HubEvent) {
            self.0.lock().unwrap().push(event.name());
        }
    }

    impl Recorder {
        fn names(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    fn config() -> HubConfig {
        HubConfig::new(SecurityKey::from("e9a2f9cbfab74abaa472ff7385dd8224"))
    }

    fn hub_with(recorder: &Recorder) -> Hub<InMemorySessionStore> {
        Hub::builder(InMemorySessionStore::new(), config())
            .listener(recorder.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_key_size() {
        let config = HubConfig::new(SecurityKey::from("short"));
        let result = Hub::new(InMemorySessionStore::new(), config);
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }

    #[test]
    fn test_new_rejects_empty_cookie_name() {
        let mut config = config();
        config.cookie.name = String::new();
        assert!(Hub::new(InMemorySessionStore::new(), config).is_err());
    }

    #[test]
    fn test_custom_codec_skips_aes_key_check() {
        struct Plain;

        impl Codec for Plain {
            fn encrypt(&self, store_key: &str, _: &SecurityKey) -> Result<String, SessionError> {
                Ok(store_key.to_owned())
            }

            fn decrypt(&self, token: &str, _: &SecurityKey) -> Result<String, SessionError> {
                Ok(token.to_owned())
            }
        }

        let config = HubConfig::new(SecurityKey::from("any length"));
        let hub = Hub::builder(InMemorySessionStore::new(), config)
            .codec(Plain)
            .build();
        assert!(hub.is_ok());
    }

    #[tokio::test]
    async fn test_codec_that_does_not_round_trip_fails_on_mint() {
        struct Lossy;

        impl Codec for Lossy {
            fn encrypt(&self, _: &str, _: &SecurityKey) -> Result<String, SessionError> {
                Ok("opaque".to_owned())
            }

            fn decrypt(&self, token: &str, _: &SecurityKey) -> Result<String, SessionError> {
                Ok(token.to_owned())
            }
        }

        let hub = Hub::builder(InMemorySessionStore::new(), config())
            .codec(Lossy)
            .build()
            .unwrap();

        let err = hub.resolve_cookie(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
        assert!(hub.store().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_fail_request() {
        struct Exploding;

        impl Listener for Exploding {
            fn handle(&self, _: &HubEvent) {
                panic!("listener failure");
            }
        }

        let recorder = Recorder::default();
        let hub = Hub::builder(InMemorySessionStore::new(), config())
            .listener(Exploding)
            .listener(recorder.clone())
            .build()
            .unwrap();

        let session = hub.resolve_cookie(&HeaderMap::new()).await.unwrap();
        assert!(hub.session_by_id(session.id()).await.unwrap().is_some());
        assert_eq!(recorder.names(), vec!["session.issued"]);
    }

    #[tokio::test]
    async fn test_new_session_id_creates_record() {
        let recorder = Recorder::default();
        let hub = hub_with(&recorder);

        let token = hub.new_session_id().await.unwrap();
        let session = hub.session_by_id(&token).await.unwrap().unwrap();

        assert_eq!(session.id(), token);
        assert_eq!(hub.store().len(), 1);
        assert_eq!(recorder.names(), vec!["session.issued"]);
    }

    #[tokio::test]
    async fn test_session_by_id_empty_token() {
        let recorder = Recorder::default();
        let hub = hub_with(&recorder);

        assert!(hub.session_by_id("").await.unwrap().is_none());
        assert_eq!(recorder.names(), vec!["session.token.empty"]);
    }

    #[tokio::test]
    async fn test_session_by_id_missing_record() {
        let recorder = Recorder::default();
        let hub = hub_with(&recorder);

        let token = hub.new_session_id().await.unwrap();
        hub.store().clear();

        assert!(hub.session_by_id(&token).await.unwrap().is_none());
        assert_eq!(
            recorder.names(),
            vec!["session.issued", "session.store_key_missing"]
        );
    }

    #[tokio::test]
    async fn test_session_by_id_forged_token() {
        let recorder = Recorder::default();
        let hub = hub_with(&recorder);

        let err = hub.session_by_id("forged").await.unwrap_err();
        assert!(err.is_tampered());
        assert_eq!(recorder.names(), vec!["session.token.rejected"]);
    }

    #[tokio::test]
    async fn test_decode_rejects_non_store_key_plaintext() {
        let hub = hub_with(&Recorder::default());
        let token = AesCbcCodec
            .encrypt("admin", &hub.config().security_key)
            .unwrap();

        let err = hub.session_by_id(&token).await.unwrap_err();
        assert!(err.is_tampered());
    }

    #[tokio::test]
    async fn test_mint_uses_session_ttl() {
        let mut config = config();
        config.session_ttl = Duration::minutes(10);
        let hub = Hub::new(InMemorySessionStore::new(), config).unwrap();

        let token = hub.new_session_id().await.unwrap();
        let session = hub.session_by_id(&token).await.unwrap().unwrap();
        let remaining = session.remaining_ttl().await.unwrap().unwrap();

        assert!(remaining <= Duration::minutes(10));
        assert!(remaining > Duration::minutes(9));
    }
}
