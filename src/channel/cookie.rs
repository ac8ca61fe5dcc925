//! Cookie transport for session tokens.
//!
//! The token travels in a `HttpOnly` cookie so page scripts never see it.

use std::sync::Mutex;

use cookie::Cookie;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

use super::Channel;
use crate::{HubConfig, SessionError};

/// Carries the token in the configured cookie.
///
/// # Example
///
/// ```rust
/// use http::HeaderMap;
/// use http::header::COOKIE;
/// use sessionhub::{Channel, CookieChannel, HubConfig};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(COOKIE, "theme=dark; session_id=abc".parse().unwrap());
///
/// let channel = CookieChannel::from_headers(&headers);
/// let token = channel.read(&HubConfig::default()).unwrap();
/// assert_eq!(token.as_deref(), Some("abc"));
/// ```
#[derive(Debug, Default)]
pub struct CookieChannel {
    request_cookies: Vec<String>,
    pending: Mutex<Option<HeaderValue>>,
}

impl CookieChannel {
    /// Captures the `Cookie` headers of an incoming request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_cookies = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .collect();

        Self {
            request_cookies,
            pending: Mutex::new(None),
        }
    }

    /// Returns the pending `Set-Cookie` value, if the hub wrote one.
    pub fn set_cookie(&self) -> Option<String> {
        self.pending
            .lock()
            .ok()
            .and_then(|pending| pending.as_ref().and_then(|v| v.to_str().ok().map(ToOwned::to_owned)))
    }

    fn stage(&self, cookie: &Cookie<'_>) -> Result<(), SessionError> {
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| SessionError::Channel(format!("invalid Set-Cookie value: {e}")))?;
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| SessionError::Channel("Lock poisoned".to_owned()))?;
        *pending = Some(value);
        Ok(())
    }
}

fn require_name(config: &HubConfig) -> Result<&str, SessionError> {
    if config.cookie.name.is_empty() {
        return Err(SessionError::Configuration(
            "cookie.name must not be empty".to_owned(),
        ));
    }
    Ok(&config.cookie.name)
}

fn build_cookie(config: &HubConfig, value: &str) -> Cookie<'static> {
    let settings = &config.cookie;
    let mut builder = Cookie::build((settings.name.clone(), value.to_owned()))
        .secure(settings.secure)
        .http_only(true)
        .same_site(settings.same_site.into());

    if !settings.path.is_empty() {
        builder = builder.path(settings.path.clone());
    }
    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(max_age) = settings.max_age {
        builder = builder.max_age(cookie::time::Duration::seconds(max_age.num_seconds()));
    }

    builder.build()
}

impl Channel for CookieChannel {
    fn read(&self, config: &HubConfig) -> Result<Option<String>, SessionError> {
        let name = require_name(config)?;

        let token = self
            .request_cookies
            .iter()
            .flat_map(|raw| Cookie::split_parse(raw.as_str()))
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty());

        Ok(token)
    }

    fn write(&self, config: &HubConfig, token: &str) -> Result<(), SessionError> {
        require_name(config)?;
        self.stage(&build_cookie(config, token))
    }

    fn destroy(&self, config: &HubConfig) -> Result<(), SessionError> {
        require_name(config)?;
        let mut cookie = build_cookie(config, "");
        cookie.make_removal();
        self.stage(&cookie)
    }

    fn response_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(pending) = self.pending.lock() {
            if let Some(value) = pending.as_ref() {
                headers.insert(SET_COOKIE, value.clone());
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::config::SameSite;

    fn request_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie.parse().unwrap());
        headers
    }

    #[test]
    fn test_read_named_cookie() {
        let channel = CookieChannel::from_headers(&request_with("a=1; session_id=tok; b=2"));
        let token = channel.read(&HubConfig::default()).unwrap();
        assert_eq!(token, Some("tok".to_owned()));
    }

    #[test]
    fn test_read_keeps_base64_padding() {
        let channel = CookieChannel::from_headers(&request_with("session_id=YWJj-_w=="));
        let token = channel.read(&HubConfig::default()).unwrap();
        assert_eq!(token, Some("YWJj-_w==".to_owned()));
    }

    #[test]
    fn test_read_across_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, "a=1".parse().unwrap());
        headers.append(COOKIE, "session_id=tok".parse().unwrap());
        let channel = CookieChannel::from_headers(&headers);
        assert_eq!(
            channel.read(&HubConfig::default()).unwrap(),
            Some("tok".to_owned())
        );
    }

    #[test]
    fn test_read_absent_or_empty() {
        let config = HubConfig::default();

        let channel = CookieChannel::from_headers(&HeaderMap::new());
        assert_eq!(channel.read(&config).unwrap(), None);

        let channel = CookieChannel::from_headers(&request_with("other=1"));
        assert_eq!(channel.read(&config).unwrap(), None);

        let channel = CookieChannel::from_headers(&request_with("session_id="));
        assert_eq!(channel.read(&config).unwrap(), None);
    }

    #[test]
    fn test_missing_cookie_name_is_config_error() {
        let mut config = HubConfig::default();
        config.cookie.name = String::new();
        let channel = CookieChannel::default();

        assert!(matches!(channel.read(&config), Err(SessionError::Configuration(_))));
        assert!(matches!(
            channel.write(&config, "tok"),
            Err(SessionError::Configuration(_))
        ));
        assert!(matches!(channel.destroy(&config), Err(SessionError::Configuration(_))));
    }

    #[test]
    fn test_write_sets_http_only_cookie() {
        let mut config = HubConfig::default();
        config.cookie.domain = Some("example.com".to_owned());
        config.cookie.max_age = Some(Duration::hours(1));
        config.cookie.same_site = SameSite::Strict;

        let channel = CookieChannel::default();
        channel.write(&config, "tok").unwrap();

        let set_cookie = channel.set_cookie().unwrap();
        assert!(set_cookie.starts_with("session_id=tok"));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Secure"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Domain=example.com"));
        assert!(set_cookie.contains("Max-Age=3600"));
        assert!(set_cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn test_insecure_cookie_omits_secure() {
        let mut config = HubConfig::default();
        config.cookie.secure = false;

        let channel = CookieChannel::default();
        channel.write(&config, "tok").unwrap();

        let set_cookie = channel.set_cookie().unwrap();
        assert!(!set_cookie.contains("Secure"));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_last_write_wins() {
        let config = HubConfig::default();
        let channel = CookieChannel::default();
        channel.write(&config, "first").unwrap();
        channel.write(&config, "second").unwrap();

        let headers = channel.response_headers();
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 1);
        assert!(channel.set_cookie().unwrap().starts_with("session_id=second"));
    }

    #[test]
    fn test_destroy_expires_cookie() {
        let config = HubConfig::default();
        let channel = CookieChannel::default();
        channel.write(&config, "tok").unwrap();
        channel.destroy(&config).unwrap();

        let set_cookie = channel.set_cookie().unwrap();
        assert!(set_cookie.starts_with("session_id=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert!(set_cookie.contains("Expires="));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_no_write_no_headers() {
        let channel = CookieChannel::default();
        assert!(channel.response_headers().is_empty());
        assert!(channel.set_cookie().is_none());
    }
}
