//! Comanda POS — order lifecycle core.
//!
//! Client-side cache and settlement engine for the Comanda point-of-sale
//! dashboard. Maintains one consistent in-memory view of active and canceled
//! orders, reconciled from two disjoint server snapshot queries plus a push
//! channel, and enforces the settlement invariants (payment sum equals
//! total, exclusive credit-account mode) before an order may move to a paid
//! or canceled state.
//!
//! The order service owns the durable truth. Every state-changing workflow
//! submits an action to it and folds the confirmed result back into the
//! cache — nothing in this crate fabricates a COBRADO or CANCELADO order
//! locally. Rendering, routing, session storage and receipt formatting are
//! external collaborators.

mod cache;
mod cancellation;
mod config;
mod desk;
mod dispatch;
mod error;
mod model;
mod realtime;
mod service;
mod settlement;
mod ticket;

pub use cache::OrderCache;
pub use cancellation::CancellationWorkflow;
pub use config::{normalize_base_url, ServiceConfig, DEFAULT_TIMEOUT};
pub use desk::OrderDesk;
pub use dispatch::DispatchWorkflow;
pub use error::{ServiceError, ValidationError, WorkflowError};
pub use model::{
    normalize_order, ClientRef, OrderItem, OrderRecord, OrderStatus, PaymentMethod, PaymentRecord,
};
pub use realtime::{parse_push_frame, PushEvent, SyncChannel};
pub use service::{HttpOrderService, OrderService, StatusAction};
pub use settlement::{build_payment_plan, ProposedPayment, SettlementEngine, SettlementOutcome};
pub use ticket::{payment_label, TicketRequest};

pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

pub(crate) fn value_f64(v: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(n) = v.get(*key).and_then(|x| x.as_f64()) {
            return Some(n);
        }
    }
    None
}

pub(crate) fn value_i64(v: &serde_json::Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        if let Some(n) = v.get(*key).and_then(|x| x.as_i64()) {
            return Some(n);
        }
    }
    None
}
