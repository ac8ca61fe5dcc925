//! Redis-backed session storage.
//!
//! Each record is a Redis hash under `{prefix}:{store_key}` with a
//! millisecond TTL.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::Script;
use redis::aio::ConnectionManager;

use super::{CREATE_TIME_FIELD, SessionStore};
use crate::SessionError;

/// Default prefix for record keys.
pub const DEFAULT_KEY_PREFIX: &str = "session";

// HSET and PEXPIRE must land together, otherwise a concurrent EXISTS could
// observe a record that never expires.
const INIT_SESSION_SCRIPT: &str = r#"
redis.call("HSET", KEYS[1], ARGV[1], ARGV[2])
return redis.call("PEXPIRE", KEYS[1], ARGV[3])
"#;

// HSET on a missing key would recreate the record without an expiry.
const SET_FIELD_SCRIPT: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 0 then
    return 0
end
redis.call("HSET", KEYS[1], ARGV[1], ARGV[2])
return 1
"#;

/// Redis session storage.
///
/// Cloning is cheap; clones share the underlying multiplexed connection.
///
/// # Example
///
/// ```rust,ignore
/// use sessionhub::RedisSessionStore;
///
/// let store = RedisSessionStore::connect("redis://127.0.0.1:6379", "shop_session").await?;
/// ```
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    key_prefix: String,
    init_script: Script,
    set_script: Script,
}

impl RedisSessionStore {
    /// Wraps an existing connection manager.
    pub fn new(connection: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            connection,
            key_prefix: key_prefix.into(),
            init_script: Script::new(INIT_SESSION_SCRIPT),
            set_script: Script::new(SET_FIELD_SCRIPT),
        }
    }

    /// Opens a connection manager for `url`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the URL is invalid or the server is
    /// unreachable.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self::new(connection, key_prefix))
    }

    fn record_key(&self, store_key: &str) -> String {
        format!("{}:{}", self.key_prefix, store_key)
    }
}

fn ttl_millis(ttl: Duration) -> i64 {
    ttl.num_milliseconds().max(1)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn init_session(&self, store_key: &str, ttl: Duration) -> Result<(), SessionError> {
        let key = self.record_key(store_key);
        let mut connection = self.connection.clone();

        let applied: i64 = self
            .init_script
            .key(&key)
            .arg(CREATE_TIME_FIELD)
            .arg(Utc::now().timestamp())
            .arg(ttl_millis(ttl))
            .invoke_async(&mut connection)
            .await?;

        if applied == 0 {
            log::error!(target: "sessionhub::store", "msg=\"pexpire rejected for new session\"");
            return Err(SessionError::Store(format!(
                "PEXPIRE did not apply to {key}"
            )));
        }
        Ok(())
    }

    async fn exists(&self, store_key: &str) -> Result<bool, SessionError> {
        let mut connection = self.connection.clone();
        let count: i64 = redis::cmd("EXISTS")
            .arg(self.record_key(store_key))
            .query_async(&mut connection)
            .await?;
        Ok(count == 1)
    }

    async fn remaining_ttl(&self, store_key: &str) -> Result<Option<Duration>, SessionError> {
        let mut connection = self.connection.clone();
        let millis: i64 = redis::cmd("PTTL")
            .arg(self.record_key(store_key))
            .query_async(&mut connection)
            .await?;
        // -2: no such key, -1: key without expiry
        Ok((millis >= 0).then(|| Duration::milliseconds(millis)))
    }

    async fn renew_ttl(&self, store_key: &str, ttl: Duration) -> Result<(), SessionError> {
        let mut connection = self.connection.clone();
        let _: i64 = redis::cmd("PEXPIRE")
            .arg(self.record_key(store_key))
            .arg(ttl_millis(ttl))
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn get(&self, store_key: &str, field: &str) -> Result<Option<String>, SessionError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = redis::cmd("HGET")
            .arg(self.record_key(store_key))
            .arg(field)
            .query_async(&mut connection)
            .await?;
        Ok(value)
    }

    async fn set(&self, store_key: &str, field: &str, value: &str) -> Result<(), SessionError> {
        let mut connection = self.connection.clone();
        let written: i64 = self
            .set_script
            .key(self.record_key(store_key))
            .arg(field)
            .arg(value)
            .invoke_async(&mut connection)
            .await?;

        if written == 0 {
            log::debug!(target: "sessionhub::store", "msg=\"dropped write to missing session record\"");
        }
        Ok(())
    }

    async fn delete(&self, store_key: &str, field: &str) -> Result<(), SessionError> {
        let mut connection = self.connection.clone();
        let _: i64 = redis::cmd("HDEL")
            .arg(self.record_key(store_key))
            .arg(field)
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn destroy(&self, store_key: &str) -> Result<(), SessionError> {
        let mut connection = self.connection.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(self.record_key(store_key))
            .query_async(&mut connection)
            .await?;
        Ok(())
    }
}
