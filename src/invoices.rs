//! Invoice generation: build payload, create invoice, resolve download link.
//!
//! The invoice service has answered with many shapes (`download_link` at the
//! top level, nested under `data`/`result`/`payload`/`invoice`, a `links`
//! object, or only an invoice id). Resolution tries them all before giving up.

use reqwest::Url;
use serde_json::Value;
use std::future::Future;
use tracing::{info, warn};

use crate::error::{ApiError, InvoiceError};
use crate::extract;
use crate::invoice_state::{InvoicePatch, InvoiceState, InvoiceStateTracker};

const DOWNLOAD_URL_PATHS: &[&str] = &[
    "download_link",
    "download_url",
    "download_uri",
    "pdf_url",
    "file_url",
    "invoice_url",
    "url",
    "data.download_link",
    "data.download_url",
    "data.download_uri",
    "result.download_link",
    "result.download_url",
    "result.download_uri",
    "payload.download_link",
    "payload.download_url",
    "payload.download_uri",
    "invoice.download_link",
    "invoice.download_url",
    "invoice.download_uri",
    "links.download",
    "links.self",
    "downloadUrl",
    "pdfUrl",
    "data.pdf_url",
];

const INVOICE_ID_PATHS: &[&str] = &[
    "invoice_id",
    "invoiceId",
    "id",
    "data.invoice_id",
    "payload.invoice_id",
];

/// The two remote calls of the generation flow.
pub trait InvoiceApi {
    /// Base address relative download links are resolved against.
    fn invoices_base(&self) -> &str;

    /// Step A: `POST {orders}/orders/{id}/invoice`.
    fn build_invoice_payload(
        &self,
        order_id: &str,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    /// Step B: `POST {invoices}/invoices` with the step A body.
    fn create_invoice(
        &self,
        payload: &Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedInvoice {
    pub url: String,
    pub result: Value,
}

/// Download reference found directly in a response body.
pub fn extract_download_url(data: &Value) -> Option<String> {
    extract::pick_string(data, DOWNLOAD_URL_PATHS)
}

/// `{base}/invoices/{id}/download` from an invoice id in `data`.
pub fn derive_url_from_id(data: &Value, base: &str) -> Option<String> {
    let id = extract::pick_string(data, INVOICE_ID_PATHS)?;
    Some(format!("{}/invoices/{id}/download", base.trim_end_matches('/')))
}

/// Resolve a possibly relative reference against `base`.
///
/// Absolute references pass through; if either side fails to parse the raw
/// reference is returned unchanged.
pub fn resolve_url(reference: &str, base: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(reference))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| reference.to_string())
}

/// Download link for a finished generation.
///
/// Looks in the create-invoice result, then the build-payload body, then
/// derives one from the invoice id in the create-invoice result.
pub fn resolve_download_url(result: &Value, payload: &Value, base: &str) -> Option<String> {
    extract_download_url(result)
        .or_else(|| extract_download_url(payload))
        .map(|reference| resolve_url(&reference, base))
        .or_else(|| derive_url_from_id(result, base))
}

/// Run both remote steps for `order_id` and resolve the download link.
pub async fn generate_invoice<A: InvoiceApi>(
    api: &A,
    order_id: &str,
) -> Result<GeneratedInvoice, ApiError> {
    let payload = api.build_invoice_payload(order_id).await?;
    let result = api.create_invoice(&payload).await?;
    let url = resolve_download_url(&result, &payload, api.invoices_base())
        .ok_or(ApiError::NoDownloadLink)?;
    Ok(GeneratedInvoice { url, result })
}

pub const CANCELLED_MESSAGE: &str = "Invoice generation cancelled";

/// Marks an in-flight generation as failed if its future is dropped before
/// it records an outcome.
struct PendingGeneration<'a> {
    tracker: &'a InvoiceStateTracker,
    order_id: &'a str,
    settled: bool,
}

impl PendingGeneration<'_> {
    fn settle(mut self, patch: InvoicePatch) -> InvoiceState {
        self.settled = true;
        self.tracker.update(self.order_id, patch)
    }
}

impl Drop for PendingGeneration<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(order_id = %self.order_id, "invoice generation cancelled");
            self.tracker.update(
                self.order_id,
                InvoicePatch::failed(CANCELLED_MESSAGE.to_string()),
            );
        }
    }
}

/// [`generate_invoice`] with state tracking.
///
/// Failures of the flow itself end up in the tracker as an `error` state and
/// are returned as `Ok`. `Err` is reserved for requests that were refused
/// without touching state: an empty id, or a generation already in flight.
/// Dropping the future part way leaves the order in `error`, so it can be
/// retried.
pub async fn generate_and_track<A: InvoiceApi>(
    api: &A,
    tracker: &InvoiceStateTracker,
    order_id: &str,
) -> Result<InvoiceState, InvoiceError> {
    if order_id.trim().is_empty() {
        return Err(InvoiceError::MissingOrderId);
    }
    if tracker.try_begin(order_id).is_none() {
        return Err(InvoiceError::InFlight(order_id.to_string()));
    }
    let pending = PendingGeneration {
        tracker,
        order_id,
        settled: false,
    };

    let state = match generate_invoice(api, order_id).await {
        Ok(generated) => {
            info!(order_id = %order_id, url = %generated.url, "invoice ready");
            pending.settle(InvoicePatch::ready(generated.url, generated.result))
        }
        Err(e) => {
            warn!(order_id = %order_id, error = %e, "invoice generation failed");
            pending.settle(InvoicePatch::failed(e.to_string()))
        }
    };
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Step;
    use crate::invoice_state::InvoiceStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const BASE: &str = "http://localhost:8000";

    /// Scripted responses for both steps; records what step B received.
    struct FakeApi {
        payload: Result<Value, u16>,
        result: Result<Value, u16>,
        calls: AtomicUsize,
        received: Mutex<Option<Value>>,
        release: Option<tokio::sync::Notify>,
    }

    impl FakeApi {
        fn new(payload: Value, result: Value) -> Self {
            Self {
                payload: Ok(payload),
                result: Ok(result),
                calls: AtomicUsize::new(0),
                received: Mutex::new(None),
                release: None,
            }
        }
    }

    impl InvoiceApi for FakeApi {
        fn invoices_base(&self) -> &str {
            BASE
        }

        async fn build_invoice_payload(&self, order_id: &str) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            match &self.payload {
                Ok(v) => Ok(v.clone()),
                Err(status) => Err(ApiError::Status {
                    step: Step::BuildPayload {
                        order_id: order_id.to_string(),
                    },
                    status: *status,
                    detail: None,
                }),
            }
        }

        async fn create_invoice(&self, payload: &Value) -> Result<Value, ApiError> {
            *self.received.lock().unwrap() = Some(payload.clone());
            match &self.result {
                Ok(v) => Ok(v.clone()),
                Err(status) => Err(ApiError::Status {
                    step: Step::CreateInvoice,
                    status: *status,
                    detail: None,
                }),
            }
        }
    }

    #[test]
    fn relative_link_is_resolved_against_base() {
        assert_eq!(
            resolve_download_url(&json!({ "download_link": "/d/1" }), &json!({}), BASE).as_deref(),
            Some("http://localhost:8000/d/1")
        );
    }

    #[test]
    fn absolute_nested_link_passes_through() {
        assert_eq!(
            resolve_download_url(&json!({ "data": { "download_url": "https://x/y" } }), &json!({}), BASE)
                .as_deref(),
            Some("https://x/y")
        );
    }

    #[test]
    fn invoice_id_derives_canonical_path() {
        assert_eq!(
            resolve_download_url(&json!({ "invoice_id": "abc" }), &json!({}), BASE).as_deref(),
            Some("http://localhost:8000/invoices/abc/download")
        );
        assert_eq!(
            derive_url_from_id(&json!({ "payload": { "invoice_id": 42 } }), "http://h/").as_deref(),
            Some("http://h/invoices/42/download")
        );
    }

    #[test]
    fn payload_link_is_the_fallback() {
        let result = json!({ "status": "created" });
        let payload = json!({ "links": { "download": "files/inv.pdf" } });
        assert_eq!(
            resolve_download_url(&result, &payload, BASE).as_deref(),
            Some("http://localhost:8000/files/inv.pdf")
        );
    }

    #[test]
    fn result_link_wins_over_payload_and_id() {
        let result = json!({ "invoice_id": "abc", "pdf_url": "/pdf/abc" });
        let payload = json!({ "download_url": "/other" });
        assert_eq!(
            resolve_download_url(&result, &payload, BASE).as_deref(),
            Some("http://localhost:8000/pdf/abc")
        );
    }

    #[test]
    fn nothing_resolvable_is_none() {
        assert_eq!(resolve_download_url(&json!({}), &json!({}), BASE), None);
        assert_eq!(resolve_download_url(&json!(null), &json!([1]), BASE), None);
    }

    #[test]
    fn resolve_url_keeps_raw_reference_on_bad_base() {
        assert_eq!(resolve_url("/d/1", "not a url"), "/d/1");
        assert_eq!(resolve_url("mailto:billing@example.com", BASE), "mailto:billing@example.com");
    }

    #[tokio::test]
    async fn scenario_ready_with_resolved_url() {
        let api = FakeApi::new(
            json!({ "order_id": "111-222" }),
            json!({ "result": { "download_link": "/inv/1.pdf" } }),
        );
        let tracker = InvoiceStateTracker::new();
        let state = generate_and_track(&api, &tracker, "111-222").await.unwrap();

        assert_eq!(state.status, InvoiceStatus::Ready);
        assert_eq!(state.url.as_deref(), Some("http://localhost:8000/inv/1.pdf"));
        assert_eq!(state.err_msg, None);
        assert_eq!(tracker.get("111-222"), state);
        assert_eq!(
            *api.received.lock().unwrap(),
            Some(json!({ "order_id": "111-222" }))
        );
    }

    #[tokio::test]
    async fn empty_responses_fail_with_no_download_link() {
        let api = FakeApi::new(json!({}), json!({}));
        let err = generate_invoice(&api, "X").await.unwrap_err();
        assert!(matches!(err, ApiError::NoDownloadLink));

        let tracker = InvoiceStateTracker::new();
        let state = generate_and_track(&api, &tracker, "X").await.unwrap();
        assert_eq!(state.status, InvoiceStatus::Error);
        assert_eq!(
            state.err_msg.as_deref(),
            Some("No download link found in invoice response")
        );
        assert_eq!(state.url, None);
    }

    #[tokio::test]
    async fn step_a_failure_skips_step_b() {
        let mut api = FakeApi::new(json!({}), json!({ "url": "/x" }));
        api.payload = Err(404);
        let tracker = InvoiceStateTracker::new();
        let state = generate_and_track(&api, &tracker, "9").await.unwrap();
        assert_eq!(state.status, InvoiceStatus::Error);
        assert_eq!(state.err_msg.as_deref(), Some("POST /orders/9/invoice failed: 404"));
        assert!(api.received.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn step_b_failure_reports_status() {
        let mut api = FakeApi::new(json!({ "order_id": "9" }), json!({}));
        api.result = Err(502);
        let err = generate_invoice(&api, "9").await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "POST /invoices failed: 502");
    }

    #[tokio::test]
    async fn retry_after_error_overwrites_state() {
        let tracker = InvoiceStateTracker::new();
        let failing = FakeApi::new(json!({}), json!({}));
        generate_and_track(&failing, &tracker, "A").await.unwrap();
        assert_eq!(tracker.get("A").status, InvoiceStatus::Error);

        let working = FakeApi::new(json!({}), json!({ "invoice_id": "inv-7" }));
        let state = generate_and_track(&working, &tracker, "A").await.unwrap();
        assert_eq!(state.status, InvoiceStatus::Ready);
        assert_eq!(state.err_msg, None);
        assert_eq!(
            state.url.as_deref(),
            Some("http://localhost:8000/invoices/inv-7/download")
        );
    }

    #[tokio::test]
    async fn empty_order_id_is_refused_without_state() {
        let api = FakeApi::new(json!({}), json!({ "url": "/x" }));
        let tracker = InvoiceStateTracker::new();
        assert!(matches!(
            generate_and_track(&api, &tracker, "  ").await,
            Err(InvoiceError::MissingOrderId)
        ));
        assert!(tracker.snapshot().is_empty());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_request_for_same_id_is_refused_while_in_flight() {
        let mut api = FakeApi::new(json!({}), json!({ "url": "/x" }));
        api.release = Some(tokio::sync::Notify::new());
        let tracker = InvoiceStateTracker::new();

        let first = generate_and_track(&api, &tracker, "A");
        let second = async {
            tokio::task::yield_now().await;
            let refused = generate_and_track(&api, &tracker, "A").await;
            if let Some(release) = &api.release {
                release.notify_one();
            }
            refused
        };
        let (first, second) = tokio::join!(first, second);

        assert!(matches!(second, Err(InvoiceError::InFlight(id)) if id == "A"));
        assert_eq!(first.unwrap().status, InvoiceStatus::Ready);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_generations_for_distinct_ids_stay_separate() {
        let ok = FakeApi::new(json!({}), json!({ "url": "/ok.pdf" }));
        let bad = FakeApi::new(json!({}), json!({}));
        let tracker = InvoiceStateTracker::new();

        let (x, y) = tokio::join!(
            generate_and_track(&ok, &tracker, "X"),
            generate_and_track(&bad, &tracker, "Y"),
        );
        assert_eq!(x.unwrap().status, InvoiceStatus::Ready);
        assert_eq!(y.unwrap().status, InvoiceStatus::Error);
        assert_eq!(tracker.get("X").url.as_deref(), Some("http://localhost:8000/ok.pdf"));
        assert_eq!(tracker.get("Y").url, None);
    }

    #[tokio::test]
    async fn dropped_generation_can_be_retried() {
        let mut stuck = FakeApi::new(json!({}), json!({ "url": "/x" }));
        stuck.release = Some(tokio::sync::Notify::new());
        let tracker = InvoiceStateTracker::new();

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            generate_and_track(&stuck, &tracker, "A"),
        )
        .await;
        assert!(timed_out.is_err());

        let state = tracker.get("A");
        assert_eq!(state.status, InvoiceStatus::Error);
        assert_eq!(state.err_msg.as_deref(), Some(CANCELLED_MESSAGE));

        let ok = FakeApi::new(json!({}), json!({ "url": "/x" }));
        let retried = generate_and_track(&ok, &tracker, "A").await.unwrap();
        assert_eq!(retried.status, InvoiceStatus::Ready);
    }
}
