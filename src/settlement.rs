//! Payment-splitting validation and the settlement submission protocol.
//!
//! A settlement either uses the client's credit account exclusively, or
//! splits the total across one or two immediate payment instruments. The
//! engine re-checks every invariant itself before any network call — the UI
//! disables submission below the total, but the UI is not trusted here — and
//! only the order service's acceptance moves an order to COBRADO.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::OrderCache;
use crate::error::{ValidationError, WorkflowError};
use crate::model::{OrderRecord, PaymentMethod, PaymentRecord};
use crate::service::{OrderService, StatusAction};
use crate::ticket::{payment_label, TicketRequest};

/// One payment entry as entered in the settlement form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposedPayment {
    pub method: PaymentMethod,
    pub amount: f64,
}

impl ProposedPayment {
    pub fn new(method: PaymentMethod, amount: f64) -> Self {
        Self { method, amount }
    }
}

/// What an accepted settlement hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementOutcome {
    pub order_id: String,
    /// The payment list as submitted (zero-amount entries already omitted).
    pub payments: Vec<PaymentRecord>,
    /// Present when printing was requested; hand it to the ticket component.
    pub ticket: Option<TicketRequest>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a proposed payment set against an order and build the list to
/// submit. Pure: no network, no cache mutation.
///
/// Credit mode: exactly one CUENTA_CORRIENTE entry covering the full total,
/// on an order whose client identity is resolvable. Split mode: one or two
/// non-credit entries whose amounts sum exactly — no tolerance — to the
/// total. Zero-amount legs are dropped from the submitted list; a zero split
/// is not a payment.
pub fn build_payment_plan(
    order: &OrderRecord,
    proposed: &[ProposedPayment],
) -> Result<Vec<PaymentRecord>, ValidationError> {
    if order.status.is_terminal() {
        return Err(ValidationError::TerminalState {
            id: order.id.clone(),
            status: order.status.to_string(),
        });
    }

    let credit_entries = proposed.iter().filter(|p| p.method.is_credit()).count();

    if credit_entries > 0 {
        if proposed.len() != 1 {
            return Err(ValidationError::MixedCreditPayments);
        }
        if !order.has_credit_identity() {
            return Err(ValidationError::MissingCreditClient);
        }
        let entry = &proposed[0];
        if entry.amount != order.total {
            return Err(ValidationError::SumMismatch {
                entered: entry.amount,
                total: order.total,
            });
        }
        return Ok(vec![PaymentRecord {
            method: PaymentMethod::CuentaCorriente,
            amount: order.total,
            client: order.client_id().map(str::to_string),
        }]);
    }

    if proposed.is_empty() || proposed.len() > 2 {
        return Err(ValidationError::BadSplitShape {
            count: proposed.len(),
        });
    }

    let entered: f64 = proposed.iter().map(|p| p.amount).sum();
    if entered != order.total {
        return Err(ValidationError::SumMismatch {
            entered,
            total: order.total,
        });
    }

    Ok(proposed
        .iter()
        .filter(|p| p.amount > 0.0)
        .map(|p| PaymentRecord {
            method: p.method,
            amount: p.amount,
            client: None,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Validates and submits settlements against the order service.
pub struct SettlementEngine<S> {
    service: Arc<S>,
}

impl<S: OrderService> SettlementEngine<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Settle an order with the proposed payments.
    ///
    /// On acceptance the active snapshot is refetched to fold the COBRADO
    /// state into the cache. On rejection the cache is untouched and the
    /// error is recoverable — callers keep the form state for a retry.
    pub async fn settle(
        &self,
        cache: &mut OrderCache,
        order_id: &str,
        proposed: &[ProposedPayment],
        print_requested: bool,
    ) -> Result<SettlementOutcome, WorkflowError> {
        let order = cache
            .get(order_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownOrder {
                id: order_id.to_string(),
            })?;

        let payments = build_payment_plan(&order, proposed)?;

        let action = StatusAction::Cobrar {
            payments: payments.clone(),
        };
        self.service.submit_status(&order.id, &action).await?;
        info!(
            order_id = %order.id,
            methods = %payment_label(&payments),
            total = order.total,
            "settlement accepted"
        );

        // The PATCH response body is ignored in favor of a full active
        // refetch; cancellation does the opposite. Both response shapes are
        // not guaranteed to agree, so the asymmetry stays.
        match self.service.fetch_active().await {
            Ok(payloads) => cache.apply_active_snapshot(&payloads),
            Err(e) => warn!(
                error = %e,
                "active refresh after settlement failed; cache is stale until the next sync"
            ),
        }

        let ticket = print_requested.then(|| TicketRequest {
            order_snapshot: order.clone(),
            resolved_payment_label: payment_label(&payments),
        });

        Ok(SettlementOutcome {
            order_id: order.id,
            payments,
            ticket,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
