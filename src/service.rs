//! Order service client boundary.
//!
//! The order service owns the durable truth and performs its own validation;
//! this module is only the request/response contract: two snapshot queries
//! plus one status-action endpoint. [`OrderService`] is the seam the
//! workflows are written against, [`HttpOrderService`] the production
//! implementation.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::model::PaymentRecord;

// ---------------------------------------------------------------------------
// Wire contract
// ---------------------------------------------------------------------------

/// Body of `PATCH /orders/{id}/status`. Serializes to the server's tagged
/// shape, e.g. `{"action":"cobrar","payments":[…]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum StatusAction {
    Cobrar { payments: Vec<PaymentRecord> },
    Enviar,
    Cancelar { description: String },
}

/// Request/response contract with the external order service.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// `GET /orders` — all non-canceled orders.
    async fn fetch_active(&self) -> Result<Vec<Value>, ServiceError>;

    /// `GET /orders/canceled` — all canceled orders.
    async fn fetch_canceled(&self) -> Result<Vec<Value>, ServiceError>;

    /// `PATCH /orders/{id}/status` — returns the updated order payload.
    async fn submit_status(
        &self,
        order_id: &str,
        action: &StatusAction,
    ) -> Result<Value, ServiceError>;
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach the order service at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid order service URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Session token is invalid or expired".to_string(),
        403 => "Not authorized for this action".to_string(),
        404 => "Order service endpoint not found".to_string(),
        s if s >= 500 => format!("Order service error (HTTP {s})"),
        s => format!("Unexpected response from the order service (HTTP {s})"),
    }
}

/// Pull the service's own error detail out of a rejection body when present.
fn rejection_detail(status: StatusCode, body_text: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body_text) {
        if let Some(message) = json
            .get("error")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
    }
    if !body_text.trim().is_empty() {
        return body_text.trim().to_string();
    }
    status_error(status)
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// reqwest-backed [`OrderService`].
pub struct HttpOrderService {
    client: Client,
    config: ServiceConfig,
}

impl HttpOrderService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Perform one request against `{base}/api{path}` and return the JSON
    /// body (`null` for empty responses).
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ServiceError> {
        let url = format!("{}/api{}", self.config.base_url, path);

        let mut req = self.client.request(method, &url);
        if let Some(token) = &self.config.auth_token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ServiceError::Transport(friendly_error(&self.config.base_url, &e)))?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                message: rejection_detail(status, &body_text),
            });
        }

        debug!(%url, status = status.as_u16(), "order service request ok");
        if body_text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text).map_err(|e| {
            ServiceError::Transport(format!("Invalid JSON from the order service: {e}"))
        })
    }

    async fn fetch_list(&self, path: &str) -> Result<Vec<Value>, ServiceError> {
        let body = self.request(Method::GET, path, None).await?;
        // A non-array body degrades to an empty snapshot rather than an error.
        Ok(body.as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl OrderService for HttpOrderService {
    async fn fetch_active(&self) -> Result<Vec<Value>, ServiceError> {
        self.fetch_list("/orders").await
    }

    async fn fetch_canceled(&self) -> Result<Vec<Value>, ServiceError> {
        self.fetch_list("/orders/canceled").await
    }

    async fn submit_status(
        &self,
        order_id: &str,
        action: &StatusAction,
    ) -> Result<Value, ServiceError> {
        let body = serde_json::to_value(action)
            .map_err(|e| ServiceError::Transport(format!("Failed to encode action: {e}")))?;
        self.request(
            Method::PATCH,
            &format!("/orders/{order_id}/status"),
            Some(&body),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------


// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaymentMethod;
    use serde_json::json;

    #[test]
    fn test_status_action_wire_shapes() {
        let cobrar = StatusAction::Cobrar {
            payments: vec![PaymentRecord {
                method: PaymentMethod::Efectivo,
                amount: 60.0,
                client: None,
            }],
        };
        assert_eq!(
            serde_json::to_value(&cobrar).unwrap(),
            json!({"action": "cobrar", "payments": [{"method": "EFECTIVO", "amount": 60.0}]})
        );

        assert_eq!(
            serde_json::to_value(StatusAction::Enviar).unwrap(),
            json!({"action": "enviar"})
        );

        let cancelar = StatusAction::Cancelar {
            description: "se arrepintió".into(),
        };
        assert_eq!(
            serde_json::to_value(&cancelar).unwrap(),
            json!({"action": "cancelar", "description": "se arrepintió"})
        );
    }

    #[test]
    fn test_status_error_messages() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED),
            "Session token is invalid or expired"
        );
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            "Order service error (HTTP 500)"
        );
        assert!(status_error(StatusCode::IM_A_TEAPOT).contains("418"));
    }

    #[test]
    fn test_rejection_detail_prefers_service_message() {
        let status = StatusCode::CONFLICT;
        assert_eq!(
            rejection_detail(status, r#"{"error": "order already settled"}"#),
            "order already settled"
        );
        assert_eq!(
            rejection_detail(status, r#"{"message": "stale order"}"#),
            "stale order"
        );
        assert_eq!(rejection_detail(status, "plain text"), "plain text");
        assert_eq!(rejection_detail(status, ""), status_error(status));
    }
}
