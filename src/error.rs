//! Error types shared across the dashboard.
//!
//! Every failure surfaces to the front-end as a single human-readable
//! message; the variants only record which step failed and why.

use std::fmt;

use thiserror::Error;

/// The remote call an [`ApiError`] belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    FetchOrders,
    BuildPayload { order_id: String },
    CreateInvoice,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::FetchOrders => write!(f, "GET /orders"),
            Step::BuildPayload { order_id } => write!(f, "POST /orders/{order_id}/invoice"),
            Step::CreateInvoice => write!(f, "POST /invoices"),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.trim().is_empty() => format!(" ({})", d.trim()),
        _ => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{step} failed: {message}")]
    Transport { step: Step, message: String },

    #[error("{step} failed: {status}{}", detail_suffix(.detail))]
    Status {
        step: Step,
        status: u16,
        detail: Option<String>,
    },

    #[error("{step} returned invalid JSON: {message}")]
    InvalidJson { step: Step, message: String },

    #[error("No download link found in invoice response")]
    NoDownloadLink,

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl ApiError {
    /// HTTP status of a non-success response, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("Order id is empty")]
    MissingOrderId,

    #[error("Invoice generation already in progress for {0}")]
    InFlight(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialize: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("{0}")]
    Init(String),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No order list found in file")]
    NoOrderList,

    #[error("No orders to save yet")]
    NothingToExport,
}
