//! Local persistence: key/value store abstraction, order cache and flags.
//!
//! The cache is best-effort. Write failures are logged and swallowed, read
//! failures (missing or corrupt blobs) come back as "nothing cached".

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::orders::OrderRecord;

pub const LS_KEY_ORDERS: &str = "amazon-orders-cache-v1";
pub const LS_KEY_FLAGS: &str = "amazon-orders-flags-v1";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Process-memory store, used by tests and when the SQLite file cannot be
/// opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Order cache
// ---------------------------------------------------------------------------

/// Snapshot of the last order list, stored as one blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope {
    pub orders: Vec<OrderRecord>,
    pub cached_at: String,
    pub query_url: String,
}

/// Overwrite the cached order list.
pub fn cache_orders(store: &dyn KeyValueStore, orders: &[OrderRecord], query_url: &str) {
    let envelope = CacheEnvelope {
        orders: orders.to_vec(),
        cached_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        query_url: query_url.to_string(),
    };
    let result = serde_json::to_string(&envelope)
        .map_err(StoreError::from)
        .and_then(|text| store.set(LS_KEY_ORDERS, &text));
    match result {
        Ok(()) => debug!(count = orders.len(), query_url = %query_url, "order cache updated"),
        Err(e) => warn!(error = %e, "failed to cache orders"),
    }
}

pub fn load_cached_orders(store: &dyn KeyValueStore) -> Option<CacheEnvelope> {
    let raw = match store.get(LS_KEY_ORDERS) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "failed to read order cache");
            return None;
        }
    };
    match serde_json::from_str::<CacheEnvelope>(&raw) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable order cache");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Flags {
    #[serde(alias = "auto_save_json")]
    pub auto_save_json: bool,
}

pub fn save_flags(store: &dyn KeyValueStore, flags: &Flags) {
    let result = serde_json::to_string(flags)
        .map_err(StoreError::from)
        .and_then(|text| store.set(LS_KEY_FLAGS, &text));
    if let Err(e) = result {
        warn!(error = %e, "failed to save flags");
    }
}

pub fn load_flags(store: &dyn KeyValueStore) -> Flags {
    match store.get(LS_KEY_FLAGS) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable flags");
            Flags::default()
        }),
        Ok(None) => Flags::default(),
        Err(e) => {
            warn!(error = %e, "failed to read flags");
            Flags::default()
        }
    }
}
