//! Manual JSON export / import of the order list.

use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::SnapshotError;
use crate::format::file_stamp;
use crate::orders::{locate_order_list, OrderRecord};

/// Write `orders` to `{dir}/amazon-orders-{stamp}.json` (pretty JSON array).
pub fn export_orders(dir: &Path, orders: &[OrderRecord]) -> Result<PathBuf, SnapshotError> {
    if orders.is_empty() {
        return Err(SnapshotError::NothingToExport);
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("amazon-orders-{}.json", file_stamp(Utc::now())));
    let text = serde_json::to_string_pretty(orders)?;
    fs::write(&path, text)?;
    info!(path = %path.display(), count = orders.len(), "orders exported");
    Ok(path)
}

/// Parse an order snapshot. Anything the normalizer can find an order list
/// in is accepted, including raw service responses.
pub fn parse_orders_snapshot(text: &str) -> Result<Vec<OrderRecord>, SnapshotError> {
    let body: Value = serde_json::from_str(text)?;
    let items = locate_order_list(&body).ok_or(SnapshotError::NoOrderList)?;
    Ok(items.iter().map(OrderRecord::from_raw).collect())
}

pub fn import_orders(path: &Path) -> Result<Vec<OrderRecord>, SnapshotError> {
    let text = fs::read_to_string(path)?;
    let orders = parse_orders_snapshot(&text)?;
    info!(path = %path.display(), count = orders.len(), "orders imported");
    Ok(orders)
}
