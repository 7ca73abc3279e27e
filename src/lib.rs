//! Orders Dashboard - Tauri v2 Backend
//!
//! Lists orders from the orders service and generates invoices through the
//! invoices service. The core (normalization, invoice orchestration, state
//! tracking, local cache) is plain library code; the desktop shell behind the
//! `desktop` feature registers the IPC command handlers the front-end calls
//! via `@tauri-apps/api/core::invoke()`.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod format;
pub mod invoice_state;
pub mod invoices;
pub mod orders;
pub mod snapshot;
pub mod storage;

#[cfg(feature = "desktop")]
mod commands;

pub use dashboard::Dashboard;
pub use error::{ApiError, InvoiceError, SnapshotError, StoreError};
pub use invoice_state::{InvoiceState, InvoiceStatus};
pub use orders::{normalize_orders, OrderRecord, OrdersQuery};

use std::sync::Arc;
use tracing::warn;

use crate::config::DashboardConfig;
use crate::storage::{KeyValueStore, MemoryStore};

/// Open the SQLite store in `config.data_dir`, falling back to an in-memory
/// store so the dashboard still works (without a persistent cache).
pub fn open_store(config: &DashboardConfig) -> Arc<dyn KeyValueStore> {
    match db::SqliteStore::open(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "local store unavailable, cache will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

// ============================================================================
// App entry point
// ============================================================================

#[cfg(feature = "desktop")]
pub fn run() {
    use tauri::{Emitter, Manager};
    use tracing::info;

    let _ = dotenvy::dotenv();

    let guard = diagnostics::init_logging(&diagnostics::get_log_dir());
    // The file writer flushes on drop; the app runs until process exit.
    std::mem::forget(guard);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = env!("BUILD_GIT_SHA"),
        "Starting Orders Dashboard"
    );

    tauri::Builder::default()
        .setup(|app| {
            let mut config = DashboardConfig::from_env();
            if std::env::var_os("DASHBOARD_DATA_DIR").is_none() {
                config = config.with_data_dir(app.path().app_data_dir()?);
            }
            info!(
                orders_api = %config.orders_api_base,
                invoices_api = %config.invoices_api_base,
                data_dir = %config.data_dir.display(),
                "configuration loaded"
            );

            let store = open_store(&config);
            let handle = app.handle().clone();
            let tracker =
                invoice_state::InvoiceStateTracker::new().with_listener(move |order_id, state| {
                    let _ = handle.emit(
                        "invoice_state",
                        serde_json::json!({ "orderId": order_id, "state": state }),
                    );
                });

            let dashboard = Dashboard::with_tracker(config, store, tracker)?;
            dashboard.load_cached();
            app.manage(dashboard);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Orders
            commands::orders::orders_fetch,
            commands::orders::orders_query_url,
            commands::orders::orders_get_rows,
            commands::orders::orders_load_cached,
            commands::orders::orders_export_json,
            commands::orders::orders_import_json,
            // Invoices
            commands::invoices::invoice_generate,
            commands::invoices::invoice_get_state,
            commands::invoices::invoice_open,
            // Settings
            commands::settings::flags_get,
            commands::settings::flags_set,
            commands::settings::config_get,
            commands::settings::app_get_about,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Orders Dashboard");
}
