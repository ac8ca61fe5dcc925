use std::sync::Mutex;

use http::{HeaderMap, HeaderName, HeaderValue};

use super::Channel;
use crate::{HubConfig, SessionError};

/// Carries the token in a plain request/response header.
///
/// Meant for native apps and API clients that store the token themselves.
/// Nothing is persisted on the client automatically, so [`Channel::destroy`]
/// is a no-op: the client forgets the token on its own.
#[derive(Debug, Default)]
pub struct HeaderChannel {
    request: HeaderMap,
    pending: Mutex<Option<(HeaderName, HeaderValue)>>,
}

impl HeaderChannel {
    /// Captures the headers of an incoming request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            request: headers.clone(),
            pending: Mutex::new(None),
        }
    }
}

fn header_name(config: &HubConfig) -> Result<HeaderName, SessionError> {
    if config.header.key.is_empty() {
        return Err(SessionError::Configuration(
            "header.key must not be empty".to_owned(),
        ));
    }
    HeaderName::from_bytes(config.header.key.as_bytes()).map_err(|_| {
        SessionError::Configuration(format!(
            "header.key {:?} is not a valid header name",
            config.header.key
        ))
    })
}

impl Channel for HeaderChannel {
    fn read(&self, config: &HubConfig) -> Result<Option<String>, SessionError> {
        let name = header_name(config)?;
        Ok(self
            .request
            .get(&name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned))
    }

    fn write(&self, config: &HubConfig, token: &str) -> Result<(), SessionError> {
        let name = header_name(config)?;
        let value = HeaderValue::from_str(token)
            .map_err(|e| SessionError::Channel(format!("invalid token header value: {e}")))?;
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| SessionError::Channel("Lock poisoned".to_owned()))?;
        *pending = Some((name, value));
        Ok(())
    }

    fn destroy(&self, config: &HubConfig) -> Result<(), SessionError> {
        header_name(config)?;
        Ok(())
    }

    fn response_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(pending) = self.pending.lock() {
            if let Some((name, value)) = pending.as_ref() {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers
    }
}
