//! Order and payment value types plus payload normalization.
//!
//! The order service and the push channel emit heterogeneous payloads: the
//! identity field may be `id`, `_id` or `number`, order numbers arrive as
//! strings or bare numbers, and the embedded `client` object is sometimes a
//! populated entity and sometimes a bare reference. [`normalize_order`]
//! canonicalizes any of them into one [`OrderRecord`] shape.
//!
//! Normalization is pure and total. Unknown or malformed fields degrade to
//! `None`, empty strings or zero — never to an error — so even a broken
//! payload yields a renderable record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{value_f64, value_i64, value_str};

// ---------------------------------------------------------------------------
// Order status
// ---------------------------------------------------------------------------

/// Lifecycle state of an order.
///
/// `PROCESO → ENVIADO → COBRADO` via dispatch and settlement (settlement may
/// also fire directly from PROCESO), and `{PROCESO, ENVIADO} → CANCELADO`.
/// COBRADO and CANCELADO are terminal. Statuses the server introduces that
/// this core does not know land in `Other` and are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Proceso,
    Enviado,
    Cobrado,
    Cancelado,
    Other(String),
}

impl OrderStatus {
    /// Parse a raw status string. Upper-cases on the way in; absent or
    /// unrecognized values map to `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "PROCESO" => OrderStatus::Proceso,
            "ENVIADO" => OrderStatus::Enviado,
            "COBRADO" => OrderStatus::Cobrado,
            "CANCELADO" => OrderStatus::Cancelado,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Proceso => "PROCESO",
            OrderStatus::Enviado => "ENVIADO",
            OrderStatus::Cobrado => "COBRADO",
            OrderStatus::Cancelado => "CANCELADO",
            OrderStatus::Other(s) => s,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, OrderStatus::Cancelado)
    }

    /// Terminal states permit no further transition through this core.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cobrado | OrderStatus::Cancelado)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        OrderStatus::parse(&raw)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Payment method
// ---------------------------------------------------------------------------

/// Payment instruments the settlement form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "EFECTIVO")]
    Efectivo,
    #[serde(rename = "TRANSFERENCIA")]
    Transferencia,
    #[serde(rename = "TARJETA")]
    Tarjeta,
    #[serde(rename = "QR")]
    Qr,
    #[serde(rename = "CUENTA_CORRIENTE")]
    CuentaCorriente,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Efectivo => "EFECTIVO",
            PaymentMethod::Transferencia => "TRANSFERENCIA",
            PaymentMethod::Tarjeta => "TARJETA",
            PaymentMethod::Qr => "QR",
            PaymentMethod::CuentaCorriente => "CUENTA_CORRIENTE",
        }
    }

    /// Credit defers cash settlement to the client's running balance and is
    /// exclusive of every other method.
    pub fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::CuentaCorriente)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Reference to a client entity, extracted only when the source payload
/// embeds a populated client object carrying its own identity key. A bare id
/// string is discarded at normalization time — it cannot be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One order line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub name: String,
    pub qty: i64,
    #[serde(rename = "unitTotal")]
    pub unit_total: f64,
}

/// Canonical in-cache order shape. Exactly one record per `id` exists in the
/// cache at any time; `total` comes from the order service and is never
/// recomputed client-side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientRef>,
    pub items: Vec<OrderItem>,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

impl OrderRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Id of the embedded client entity, when one was resolvable.
    pub fn client_id(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.id.as_str())
    }

    /// Whether a credit-account settlement can identify who owes the balance:
    /// a resolved client reference, or a customer name as a weaker fallback.
    pub fn has_credit_identity(&self) -> bool {
        self.client.is_some()
            || self
                .customer_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty())
    }
}

/// One payment leg submitted with a settlement. Ephemeral: constructed during
/// settlement only, never stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub method: PaymentMethod,
    pub amount: f64,
    /// Client owing the balance; only meaningful for CUENTA_CORRIENTE.
    #[serde(rename = "client", skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// String form of a field that may arrive as a string or a bare number.
fn display_string(payload: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match payload.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.trim().to_string());
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Resolve the stable identity key: `id`, then `_id`, then `number`, then a
/// generated fallback so even malformed payloads stay renderable and keyable.
fn resolve_id(payload: &Value) -> String {
    display_string(payload, &["id", "_id", "number"])
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn extract_client(payload: &Value) -> Option<ClientRef> {
    let client = payload.get("client")?;
    let id = value_str(client, &["_id", "id"])?;
    Some(ClientRef {
        id,
        name: value_str(client, &["name"]),
    })
}

fn extract_items(payload: &Value) -> Vec<OrderItem> {
    let Some(items) = payload.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| OrderItem {
            name: value_str(item, &["name"]).unwrap_or_default(),
            qty: value_i64(item, &["qty", "quantity"]).unwrap_or(1),
            unit_total: value_f64(item, &["unitTotal", "total"]).unwrap_or(0.0),
        })
        .collect()
}

fn extract_timestamp(payload: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = payload.get(key).and_then(Value::as_str)?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Canonicalize an arbitrary order payload into an [`OrderRecord`].
///
/// Total: this never fails. Missing status degrades to an empty `Other`
/// string, missing amounts to zero, a client object without its own identity
/// key to no client at all.
pub fn normalize_order(payload: &Value) -> OrderRecord {
    let raw_status = payload
        .get("status")
        .map(|s| match s {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    OrderRecord {
        id: resolve_id(payload),
        number: display_string(payload, &["number"]),
        status: OrderStatus::parse(&raw_status),
        customer_name: value_str(payload, &["customerName"]),
        client: extract_client(payload),
        items: extract_items(payload),
        total: value_f64(payload, &["total"]).unwrap_or(0.0),
        table: display_string(payload, &["table"]),
        address: value_str(payload, &["address"]),
        canceled_at: extract_timestamp(payload, "canceledAt"),
        cancel_reason: value_str(payload, &["cancelReason"]),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
