use serde_json::Value;
use tauri::State;

use crate::dashboard::Dashboard;
use crate::diagnostics;
use crate::storage::Flags;

#[tauri::command]
pub fn flags_get(dashboard: State<'_, Dashboard>) -> Flags {
    dashboard.flags()
}

#[tauri::command]
pub fn flags_set(flags: Flags, dashboard: State<'_, Dashboard>) -> Flags {
    dashboard.set_flags(flags)
}

#[tauri::command]
pub fn config_get(dashboard: State<'_, Dashboard>) -> Value {
    let config = dashboard.config();
    serde_json::json!({
        "ordersApiBase": config.orders_api_base,
        "invoicesApiBase": config.invoices_api_base,
        "exportDir": config.export_dir,
        "requestTimeoutSecs": config.request_timeout.as_secs(),
    })
}

#[tauri::command]
pub fn app_get_about() -> Value {
    diagnostics::get_about_info()
}
