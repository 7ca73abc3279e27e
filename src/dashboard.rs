//! Application state behind the order table.
//!
//! Owns the current order list, the invoice tracker, the local store and the
//! API client. The desktop commands are thin wrappers over these methods.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::DashboardConfig;
use crate::error::{ApiError, InvoiceError, SnapshotError};
use crate::format::format_iso;
use crate::invoice_state::{InvoiceState, InvoiceStateTracker, InvoiceStatus};
use crate::invoices::generate_and_track;
use crate::orders::{normalize_orders, OrderRecord, OrdersQuery};
use crate::snapshot;
use crate::storage::{self, CacheEnvelope, Flags, KeyValueStore};

/// One table row as rendered by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub id: String,
    pub purchase_date: String,
    pub purchase_date_display: String,
    pub status: String,
    pub buyer_name: String,
    pub invoice: InvoiceState,
}

/// Result of a fetch: the rows plus where they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub query_url: String,
    pub orders: Vec<OrderRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_to: Option<PathBuf>,
}

pub struct Dashboard {
    config: DashboardConfig,
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
    orders: Mutex<Vec<OrderRecord>>,
    invoices: InvoiceStateTracker,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        Self::with_tracker(config, store, InvoiceStateTracker::new())
    }

    /// Like [`Dashboard::new`] with a caller-built tracker (e.g. one with a
    /// change listener).
    pub fn with_tracker(
        config: DashboardConfig,
        store: Arc<dyn KeyValueStore>,
        invoices: InvoiceStateTracker,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            config,
            api,
            store,
            orders: Mutex::new(Vec::new()),
            invoices,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    fn orders_guard(&self) -> MutexGuard<'_, Vec<OrderRecord>> {
        self.orders.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn replace_orders(&self, orders: Vec<OrderRecord>) {
        *self.orders_guard() = orders;
    }

    pub fn orders(&self) -> Vec<OrderRecord> {
        self.orders_guard().clone()
    }

    pub fn query_url(&self, query: &OrdersQuery) -> Result<String, ApiError> {
        self.api.orders_query_url(query)
    }

    /// Fetch, normalize, cache, and (when enabled) auto-export the order list.
    ///
    /// On failure the current list and cache are left as they were.
    pub async fn fetch_orders(&self, query: &OrdersQuery) -> Result<FetchOutcome, ApiError> {
        let (query_url, body) = self.api.fetch_orders(query).await?;
        let orders = normalize_orders(&body);
        info!(count = orders.len(), "orders normalized");

        storage::cache_orders(self.store.as_ref(), &orders, &query_url);
        self.replace_orders(orders.clone());

        let exported_to = if self.flags().auto_save_json && !orders.is_empty() {
            match snapshot::export_orders(&self.config.export_dir, &orders) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "auto-save of orders JSON failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(FetchOutcome {
            query_url,
            orders,
            exported_to,
        })
    }

    /// Restore the last cached list, if any, as the current list.
    pub fn load_cached(&self) -> Option<CacheEnvelope> {
        let envelope = storage::load_cached_orders(self.store.as_ref())?;
        self.replace_orders(envelope.orders.clone());
        info!(
            count = envelope.orders.len(),
            cached_at = %envelope.cached_at,
            "loaded cached orders"
        );
        Some(envelope)
    }

    pub fn export_orders(&self) -> Result<PathBuf, SnapshotError> {
        snapshot::export_orders(&self.config.export_dir, &self.orders())
    }

    /// Replace the current list with the contents of a snapshot file.
    ///
    /// A file that does not parse leaves the current list untouched.
    pub fn import_orders(&self, path: &Path) -> Result<Vec<OrderRecord>, SnapshotError> {
        let orders = snapshot::import_orders(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        storage::cache_orders(self.store.as_ref(), &orders, &format!("import:{name}"));
        self.replace_orders(orders.clone());
        Ok(orders)
    }

    pub fn flags(&self) -> Flags {
        storage::load_flags(self.store.as_ref())
    }

    pub fn set_flags(&self, flags: Flags) -> Flags {
        storage::save_flags(self.store.as_ref(), &flags);
        flags
    }

    pub fn invoice_state(&self, order_id: &str) -> InvoiceState {
        self.invoices.get(order_id)
    }

    pub async fn generate_invoice(&self, order_id: &str) -> Result<InvoiceState, InvoiceError> {
        generate_and_track(&self.api, &self.invoices, order_id).await
    }

    /// Open a ready invoice in the system browser.
    pub fn open_invoice(&self, order_id: &str) -> Result<String, String> {
        let state = self.invoices.get(order_id);
        let url = match (state.status, state.url) {
            (InvoiceStatus::Ready, Some(url)) => url,
            _ => return Err(format!("No invoice ready for {order_id}")),
        };
        webbrowser::open(&url).map_err(|e| format!("Failed to open {url}: {e}"))?;
        info!(order_id = %order_id, "opened invoice");
        Ok(url)
    }

    pub fn rows(&self) -> Vec<OrderRow> {
        let invoices = self.invoices.snapshot();
        self.orders()
            .into_iter()
            .map(|o| OrderRow {
                invoice: invoices.get(&o.id).cloned().unwrap_or_default(),
                purchase_date_display: format_iso(&o.purchase_date),
                id: o.id,
                purchase_date: o.purchase_date,
                status: o.status,
                buyer_name: o.buyer_name,
            })
            .collect()
    }
}
