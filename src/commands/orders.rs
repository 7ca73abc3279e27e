use serde_json::Value;
use std::path::PathBuf;
use tauri::State;

use crate::dashboard::{Dashboard, OrderRow};
use crate::orders::OrdersQuery;

#[tauri::command]
pub async fn orders_fetch(
    payload: Option<Value>,
    dashboard: State<'_, Dashboard>,
) -> Result<Value, String> {
    let query = OrdersQuery::from_payload(&payload.unwrap_or(Value::Null));
    let outcome = dashboard
        .fetch_orders(&query)
        .await
        .map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "queryUrl": outcome.query_url,
        "count": outcome.orders.len(),
        "exportedTo": outcome.exported_to,
        "rows": dashboard.rows(),
    }))
}

/// Target URL preview shown under the filters.
#[tauri::command]
pub fn orders_query_url(
    payload: Option<Value>,
    dashboard: State<'_, Dashboard>,
) -> Result<String, String> {
    let query = OrdersQuery::from_payload(&payload.unwrap_or(Value::Null));
    dashboard.query_url(&query).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn orders_get_rows(dashboard: State<'_, Dashboard>) -> Vec<OrderRow> {
    dashboard.rows()
}

#[tauri::command]
pub fn orders_load_cached(dashboard: State<'_, Dashboard>) -> Result<Value, String> {
    let envelope = dashboard
        .load_cached()
        .ok_or("No cached orders found")?;
    Ok(serde_json::json!({
        "cachedAt": envelope.cached_at,
        "queryUrl": envelope.query_url,
        "rows": dashboard.rows(),
    }))
}

#[tauri::command]
pub fn orders_export_json(dashboard: State<'_, Dashboard>) -> Result<String, String> {
    dashboard
        .export_orders()
        .map(|path| path.display().to_string())
        .map_err(|e| format!("Failed to save file: {e}"))
}

#[tauri::command]
pub fn orders_import_json(
    path: String,
    dashboard: State<'_, Dashboard>,
) -> Result<Vec<OrderRow>, String> {
    dashboard
        .import_orders(&PathBuf::from(path.trim()))
        .map_err(|e| format!("Failed to import JSON: {e}"))?;
    Ok(dashboard.rows())
}
