//! In-memory session storage.
//!
//! Suitable for development, testing, and single-instance deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{CREATE_TIME_FIELD, SessionStore};
use crate::SessionError;

#[derive(Debug, Clone)]
struct Record {
    fields: HashMap<String, String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Record {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// In-memory session storage.
///
/// Stores records in a `HashMap` protected by a `RwLock`. Expired records
/// behave as absent and are dropped the next time they are written to.
///
/// # Note
///
/// Records are lost when the process restarts and are not shared between
/// instances. For distributed deployments, use
/// [`RedisSessionStore`](crate::RedisSessionStore).
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<String, Record>>>,
}

impl InMemorySessionStore {
    /// Creates a new in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live records.
    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.records
            .read()
            .map(|guard| guard.values().filter(|record| record.is_live(now)).count())
            .unwrap_or(0)
    }

    /// Returns true if there are no live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every record, as a `FLUSHDB` would.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }

    fn read_live<T>(
        &self,
        store_key: &str,
        f: impl FnOnce(Option<&Record>) -> T,
    ) -> Result<T, SessionError> {
        let records = self.records.read().map_err(|_| lock_poisoned())?;
        let now = Utc::now();
        Ok(f(records.get(store_key).filter(|record| record.is_live(now))))
    }

    #[allow(clippy::significant_drop_tightening)]
    fn write_live<T>(
        &self,
        store_key: &str,
        f: impl FnOnce(&mut HashMap<String, Record>) -> T,
    ) -> Result<T, SessionError> {
        let mut records = self.records.write().map_err(|_| lock_poisoned())?;
        let now = Utc::now();
        if records.get(store_key).is_some_and(|record| !record.is_live(now)) {
            records.remove(store_key);
        }
        Ok(f(&mut records))
    }
}

fn lock_poisoned() -> SessionError {
    SessionError::Store("Lock poisoned".to_owned())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn init_session(&self, store_key: &str, ttl: Duration) -> Result<(), SessionError> {
        let now = Utc::now();
        self.write_live(store_key, |records| {
            let record = records.entry(store_key.to_owned()).or_insert_with(|| Record {
                fields: HashMap::new(),
                expires_at: None,
            });
            record
                .fields
                .insert(CREATE_TIME_FIELD.to_owned(), now.timestamp().to_string());
            record.expires_at = Some(now + ttl);
        })
    }

    async fn exists(&self, store_key: &str) -> Result<bool, SessionError> {
        self.read_live(store_key, |record| record.is_some())
    }

    async fn remaining_ttl(&self, store_key: &str) -> Result<Option<Duration>, SessionError> {
        let now = Utc::now();
        self.read_live(store_key, |record| {
            record
                .and_then(|record| record.expires_at)
                .map(|expires_at| expires_at - now)
        })
    }

    async fn renew_ttl(&self, store_key: &str, ttl: Duration) -> Result<(), SessionError> {
        let expires_at = Utc::now() + ttl;
        self.write_live(store_key, |records| {
            if let Some(record) = records.get_mut(store_key) {
                record.expires_at = Some(expires_at);
            }
        })
    }

    async fn get(&self, store_key: &str, field: &str) -> Result<Option<String>, SessionError> {
        self.read_live(store_key, |record| {
            record.and_then(|record| record.fields.get(field).cloned())
        })
    }

    async fn set(&self, store_key: &str, field: &str, value: &str) -> Result<(), SessionError> {
        self.write_live(store_key, |records| {
            if let Some(record) = records.get_mut(store_key) {
                record.fields.insert(field.to_owned(), value.to_owned());
            }
        })
    }

    async fn delete(&self, store_key: &str, field: &str) -> Result<(), SessionError> {
        self.write_live(store_key, |records| {
            if let Some(record) = records.get_mut(store_key) {
                record.fields.remove(field);
                if record.fields.is_empty() {
                    records.remove(store_key);
                }
            }
        })
    }

    async fn destroy(&self, store_key: &str) -> Result<(), SessionError> {
        self.write_live(store_key, |records| {
            records.remove(store_key);
        })
    }
}
