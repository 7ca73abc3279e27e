//! Order list normalization and the orders query.
//!
//! The orders service has shipped several response shapes over time (bare
//! array, `Orders`/`orders` wrappers, `payload`/`data` envelopes) and several
//! key spellings per field. Everything is funnelled into [`OrderRecord`].

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;
use crate::extract::{self, FieldSpec};
use crate::format;

pub const DEFAULT_MAX_PER_PAGE: u32 = 10;

/// Where the order array may live inside a response body, in priority order.
const ORDER_LIST_PATHS: &[&str] = &[
    "Orders",
    "orders",
    "payload.Orders",
    "payload.orders",
    "data.Orders",
    "data.orders",
];

pub const ORDER_ID: FieldSpec = FieldSpec::new(
    "id",
    &[
        "AmazonOrderId",
        "amazonOrderId",
        "amazon_order_id",
        "OrderId",
        "orderId",
        "order_id",
        "id",
    ],
);

pub const PURCHASE_DATE: FieldSpec = FieldSpec::new(
    "purchaseDate",
    &[
        "PurchaseDate",
        "purchaseDate",
        "purchase_date",
        "LastUpdateDate",
        "lastUpdateDate",
        "last_update_date",
        "CreatedAt",
        "created_at",
    ],
);

pub const ORDER_STATUS: FieldSpec = FieldSpec::new(
    "status",
    &["OrderStatus", "orderStatus", "order_status", "Status", "status"],
);

pub const BUYER_NAME: FieldSpec = FieldSpec::new(
    "buyerName",
    &[
        "BuyerInfo.BuyerName",
        "buyerInfo.buyerName",
        "BuyerName",
        "buyerName",
        "buyer_info.buyer_name",
        "Buyer.Name",
        "buyer.name",
    ],
);

/// Canonical order row. Every field is a plain string, `""` when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: String,
    pub purchase_date: String,
    pub status: String,
    pub buyer_name: String,
}

impl OrderRecord {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            id: ORDER_ID.string(raw),
            purchase_date: PURCHASE_DATE.string(raw),
            status: ORDER_STATUS.string(raw),
            buyer_name: BUYER_NAME.string(raw),
        }
    }
}

/// Find the raw order array in a response body.
///
/// `None` means no array at any known location, which callers that need to
/// reject malformed input (import) treat differently from an empty list.
pub fn locate_order_list(body: &Value) -> Option<&Vec<Value>> {
    if let Value::Array(items) = body {
        return Some(items);
    }
    ORDER_LIST_PATHS
        .iter()
        .filter_map(|path| extract::lookup(body, path))
        .find_map(Value::as_array)
}

/// Normalize a response body into order records, preserving source order.
/// Never fails: an unrecognised body yields an empty list.
pub fn normalize_orders(body: &Value) -> Vec<OrderRecord> {
    locate_order_list(body)
        .map(|items| items.iter().map(OrderRecord::from_raw).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdersQuery {
    pub all_pages: bool,
    pub max_per_page: u32,
    pub last_updated_after: Option<String>,
}

impl Default for OrdersQuery {
    fn default() -> Self {
        Self {
            all_pages: false,
            max_per_page: DEFAULT_MAX_PER_PAGE,
            last_updated_after: None,
        }
    }
}

impl OrdersQuery {
    /// Build the query from the loose payload the front-end sends.
    ///
    /// Accepts camelCase or snake_case keys, and numbers or booleans given as
    /// strings. `lastUpdatedAfter` is normalized to UTC; unparseable values
    /// are dropped.
    pub fn from_payload(payload: &Value) -> Self {
        let all_pages = extract::pick(payload, &["allPages", "all_pages"])
            .and_then(value_as_bool)
            .unwrap_or(false);
        let max_per_page = extract::pick(payload, &["maxPerPage", "max_per_page"])
            .and_then(value_as_u32)
            .unwrap_or(DEFAULT_MAX_PER_PAGE);
        let last_updated_after = extract::pick_string(
            payload,
            &["lastUpdatedAfter", "last_updated_after"],
        )
        .and_then(|raw| {
            let normalized = format::normalize_last_updated_after(&raw);
            if normalized.is_none() {
                warn!(value = %raw, "ignoring unparseable last_updated_after filter");
            }
            normalized
        });

        Self {
            all_pages,
            max_per_page,
            last_updated_after,
        }
    }

    fn effective_max_per_page(&self) -> u32 {
        if self.max_per_page == 0 {
            DEFAULT_MAX_PER_PAGE
        } else {
            self.max_per_page
        }
    }

    /// `{base}/orders?all_pages=…&max_per_page=…[&last_updated_after=…]`
    pub fn url(&self, orders_base: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}/orders", orders_base.trim_end_matches('/')))
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{orders_base}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("all_pages", if self.all_pages { "true" } else { "false" });
            pairs.append_pair("max_per_page", &self.effective_max_per_page().to_string());
            if let Some(after) = self.last_updated_after.as_deref() {
                if !after.trim().is_empty() {
                    pairs.append_pair("last_updated_after", after.trim());
                }
            }
        }
        Ok(url)
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    if let Some(flag) = value.as_bool() {
        return Some(flag);
    }
    if let Some(n) = value.as_i64() {
        return Some(n == 1);
    }
    match value.as_str()?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn value_as_u32(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = value.as_f64() {
        return (f >= 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32);
    }
    value.as_str()?.trim().parse::<u32>().ok()
}
