//! Session record storage.
//!
//! A record is a small hash (`field -> string`) living under a store key with
//! a TTL. The hub only needs the operations of [`SessionStore`]; retries and
//! connection handling belong to the backing client.

mod memory_store;
#[cfg(feature = "redis")]
mod redis_store;

use async_trait::async_trait;
use chrono::Duration;

use crate::SessionError;

pub use memory_store::InMemorySessionStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisSessionStore;

/// Field written by `init_session` so a fresh record is never empty.
pub const CREATE_TIME_FIELD: &str = "__session_create_time";

/// Repository for session records.
///
/// Implementations provide different storage backends:
/// - [`InMemorySessionStore`]: In-memory storage for testing and single-process use
/// - [`RedisSessionStore`](crate::RedisSessionStore): Redis hashes (feature `redis`)
///
/// Backend failures are returned as `SessionError::Store` and never retried.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates the record with its creation marker and TTL as one atomic step.
    ///
    /// A concurrent `exists` must never see the marker without the TTL.
    async fn init_session(&self, store_key: &str, ttl: Duration) -> Result<(), SessionError>;

    async fn exists(&self, store_key: &str) -> Result<bool, SessionError>;

    /// Returns the time left before the record expires.
    ///
    /// `None` means the store holds no expiry for the key: the record is
    /// missing or was persisted without a TTL.
    async fn remaining_ttl(&self, store_key: &str) -> Result<Option<Duration>, SessionError>;

    /// Resets the record's TTL. A missing record stays missing.
    async fn renew_ttl(&self, store_key: &str, ttl: Duration) -> Result<(), SessionError>;

    async fn get(&self, store_key: &str, field: &str) -> Result<Option<String>, SessionError>;

    /// Writes a field on a live record.
    ///
    /// A missing or expired record is left missing: the write is dropped, so
    /// a record can never come back without a TTL.
    async fn set(&self, store_key: &str, field: &str, value: &str) -> Result<(), SessionError>;

    async fn delete(&self, store_key: &str, field: &str) -> Result<(), SessionError>;

    /// Removes the whole record.
    async fn destroy(&self, store_key: &str) -> Result<(), SessionError>;
}
