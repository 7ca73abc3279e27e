//! Orders / invoices service client.
//!
//! Thin reqwest wrapper: every call returns the decoded JSON body or an
//! [`ApiError`] naming the step that failed and the HTTP status.

use reqwest::{Client, Response, Url};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{normalize_base_url, DashboardConfig};
use crate::error::{ApiError, Step};
use crate::invoices::InvoiceApi;
use crate::orders::OrdersQuery;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid request URL: {url}");
    }
    if err.is_body() || err.is_decode() {
        return format!("Incomplete response from {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Pull a short reason out of an error body, if the service sent one.
fn error_detail(body_text: &str) -> Option<String> {
    let trimmed = body_text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => crate::extract::pick_string(&json, &["error", "message", "detail"]),
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    orders_base: String,
    invoices_base: String,
}

impl ApiClient {
    pub fn new(config: &DashboardConfig) -> Result<Self, ApiError> {
        let orders_base = normalize_base_url(&config.orders_api_base);
        let invoices_base = normalize_base_url(&config.invoices_api_base);
        for base in [&orders_base, &invoices_base] {
            Url::parse(base).map_err(|e| ApiError::InvalidBaseUrl(format!("{base}: {e}")))?;
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            orders_base,
            invoices_base,
        })
    }

    pub fn orders_base(&self) -> &str {
        &self.orders_base
    }

    /// Full `GET /orders` URL for `query`, as shown in the UI and cached.
    pub fn orders_query_url(&self, query: &OrdersQuery) -> Result<String, ApiError> {
        query.url(&self.orders_base).map(String::from)
    }

    /// `GET /orders`; returns the query URL and the raw body.
    pub async fn fetch_orders(&self, query: &OrdersQuery) -> Result<(String, Value), ApiError> {
        let url = self.orders_query_url(query)?;
        let step = Step::FetchOrders;
        let start = Instant::now();
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                message: friendly_error(&self.orders_base, &e),
                step: step.clone(),
            })?;
        let body = read_json(step, &self.orders_base, resp).await?;
        info!(
            url = %url,
            latency_ms = start.elapsed().as_millis() as u64,
            "orders fetched"
        );
        Ok((url, body))
    }

    async fn post_json(&self, step: Step, base: &str, url: &str, body: &Value) -> Result<Value, ApiError> {
        debug!(%step, url = %url, "POST");
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                message: friendly_error(base, &e),
                step: step.clone(),
            })?;
        read_json(step, base, resp).await
    }

    /// `{orders}/orders/{id}/invoice` with the id as one encoded path segment.
    pub fn invoice_payload_url(&self, order_id: &str) -> Result<String, ApiError> {
        let invalid = |detail: String| ApiError::InvalidBaseUrl(format!("{}: {detail}", self.orders_base));
        let mut url = Url::parse(&self.orders_base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["orders", order_id, "invoice"]);
        Ok(url.into())
    }
}

/// Decode a response: non-success is a [`ApiError::Status`], an empty body is
/// `null`, anything else must be JSON. A body that fails to arrive in full is
/// a transport failure.
async fn read_json(step: Step, base: &str, resp: Response) -> Result<Value, ApiError> {
    let status = resp.status();
    let body = resp.text().await;

    if !status.is_success() {
        warn!(%step, status = status.as_u16(), "upstream returned an error status");
        return Err(ApiError::Status {
            step,
            status: status.as_u16(),
            detail: body.ok().as_deref().and_then(error_detail),
        });
    }

    let body_text = body.map_err(|e| ApiError::Transport {
        message: friendly_error(base, &e),
        step: step.clone(),
    })?;

    if body_text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body_text).map_err(|e| ApiError::InvalidJson {
        step,
        message: e.to_string(),
    })
}

impl InvoiceApi for ApiClient {
    fn invoices_base(&self) -> &str {
        &self.invoices_base
    }

    async fn build_invoice_payload(&self, order_id: &str) -> Result<Value, ApiError> {
        let url = self.invoice_payload_url(order_id)?;
        let body = serde_json::json!({ "order_id": order_id });
        self.post_json(
            Step::BuildPayload {
                order_id: order_id.to_string(),
            },
            &self.orders_base,
            &url,
            &body,
        )
        .await
    }

    async fn create_invoice(&self, payload: &Value) -> Result<Value, ApiError> {
        let url = format!("{}/invoices", self.invoices_base);
        self.post_json(Step::CreateInvoice, &self.invoices_base, &url, payload)
            .await
    }
}
