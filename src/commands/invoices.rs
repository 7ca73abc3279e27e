use tauri::State;

use crate::dashboard::Dashboard;
use crate::invoice_state::{InvoiceState, InvoiceStatus};

#[tauri::command]
pub async fn invoice_generate(
    order_id: String,
    dashboard: State<'_, Dashboard>,
) -> Result<InvoiceState, String> {
    let order_id = order_id.trim().to_string();
    let state = dashboard
        .generate_invoice(&order_id)
        .await
        .map_err(|e| e.to_string())?;
    if state.status == InvoiceStatus::Error {
        let reason = state.err_msg.as_deref().unwrap_or("unknown error");
        return Err(format!("Invoice failed for {order_id}: {reason}"));
    }
    Ok(state)
}

#[tauri::command]
pub fn invoice_get_state(order_id: String, dashboard: State<'_, Dashboard>) -> InvoiceState {
    dashboard.invoice_state(order_id.trim())
}

#[tauri::command]
pub fn invoice_open(order_id: String, dashboard: State<'_, Dashboard>) -> Result<String, String> {
    dashboard.open_invoice(order_id.trim())
}
