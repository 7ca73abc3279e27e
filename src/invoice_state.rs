//! Per-order invoice generation state.
//!
//! Entries are created on the first generation attempt and live for the
//! process lifetime. Writes are merged patches so concurrent generations for
//! different orders never touch each other's entries.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Idle,
    Generating,
    Ready,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceState {
    pub status: InvoiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Partial update. Outer `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePatch {
    pub status: Option<InvoiceStatus>,
    pub url: Option<Option<String>>,
    pub err_msg: Option<Option<String>>,
    pub data: Option<Option<Value>>,
}

impl InvoicePatch {
    pub fn generating() -> Self {
        Self {
            status: Some(InvoiceStatus::Generating),
            url: Some(None),
            err_msg: Some(None),
            data: Some(None),
        }
    }

    pub fn ready(url: String, data: Value) -> Self {
        Self {
            status: Some(InvoiceStatus::Ready),
            url: Some(Some(url)),
            err_msg: Some(None),
            data: Some(Some(data)),
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            status: Some(InvoiceStatus::Error),
            url: Some(None),
            err_msg: Some(Some(message)),
            data: Some(None),
        }
    }

    fn apply(self, state: &mut InvoiceState) {
        if let Some(status) = self.status {
            state.status = status;
        }
        if let Some(url) = self.url {
            state.url = url;
        }
        if let Some(err_msg) = self.err_msg {
            state.err_msg = err_msg;
        }
        if let Some(data) = self.data {
            state.data = data;
        }
    }
}

type Listener = Box<dyn Fn(&str, &InvoiceState) + Send + Sync>;

#[derive(Default)]
pub struct InvoiceStateTracker {
    entries: Mutex<HashMap<String, InvoiceState>>,
    listener: Option<Listener>,
}

impl InvoiceStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with `(order_id, new_state)` after every write.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&str, &InvoiceState) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, InvoiceState>> {
        // Writes are single merges, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, order_id: &str, state: &InvoiceState) {
        if let Some(listener) = &self.listener {
            listener(order_id, state);
        }
    }

    /// Current state for `order_id`, `idle` when no attempt has been made.
    pub fn get(&self, order_id: &str) -> InvoiceState {
        self.entries().get(order_id).cloned().unwrap_or_default()
    }

    /// Merge `patch` into the entry for `order_id`, creating it if absent.
    pub fn update(&self, order_id: &str, patch: InvoicePatch) -> InvoiceState {
        let updated = {
            let mut entries = self.entries();
            let entry = entries.entry(order_id.to_string()).or_default();
            patch.apply(entry);
            entry.clone()
        };
        self.notify(order_id, &updated);
        updated
    }

    /// Move `order_id` to `generating` unless it already is.
    ///
    /// Returns `None` when a generation is in flight; the existing entry is
    /// left untouched.
    pub fn try_begin(&self, order_id: &str) -> Option<InvoiceState> {
        let started = {
            let mut entries = self.entries();
            let entry = entries.entry(order_id.to_string()).or_default();
            if entry.status == InvoiceStatus::Generating {
                return None;
            }
            InvoicePatch::generating().apply(entry);
            entry.clone()
        };
        self.notify(order_id, &started);
        Some(started)
    }

    pub fn snapshot(&self) -> HashMap<String, InvoiceState> {
        self.entries().clone()
    }
}
