//! Order cancellation workflow.
//!
//! Captures a free-text reason, submits the cancel action, and folds the
//! server's canonical post-cancellation record back into the cache by id.
//! The server response — not local state — is what carries `canceledAt` and
//! `cancelReason`; nothing here marks an order CANCELADO on its own.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::OrderCache;
use crate::error::{ValidationError, WorkflowError};
use crate::model::{normalize_order, OrderRecord};
use crate::service::{OrderService, StatusAction};

pub struct CancellationWorkflow<S> {
    service: Arc<S>,
}

impl<S: OrderService> CancellationWorkflow<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Cancel an order, permitted from PROCESO and ENVIADO.
    ///
    /// On success the returned record replaces the prior entry in the cache
    /// and is handed back. On failure the cache is untouched and the error
    /// is recoverable — the caller keeps the entered reason for a retry.
    pub async fn cancel(
        &self,
        cache: &mut OrderCache,
        order_id: &str,
        reason: &str,
    ) -> Result<OrderRecord, WorkflowError> {
        let order = cache
            .get(order_id)
            .ok_or_else(|| ValidationError::UnknownOrder {
                id: order_id.to_string(),
            })?;
        if order.status.is_terminal() {
            return Err(ValidationError::TerminalState {
                id: order.id.clone(),
                status: order.status.to_string(),
            }
            .into());
        }

        let action = StatusAction::Cancelar {
            description: reason.to_string(),
        };
        let confirmed = self.service.submit_status(order_id, &action).await?;

        // Single-record fold-back by id — no full refetch here, unlike
        // settlement. The two server response shapes are not guaranteed to
        // agree, so the asymmetry is preserved rather than unified.
        let record = normalize_order(&confirmed);
        if !cache.replace_by_id(record.clone()) {
            warn!(order_id, "canceled order no longer in cache, fold-back dropped");
        }
        info!(order_id, reason, "order canceled");
        Ok(record)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
