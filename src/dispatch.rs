//! Marks an in-process order as sent out.
//!
//! The enviar action is the PROCESO → ENVIADO edge of the state machine.
//! Like settlement, the server response body is ignored and the active
//! snapshot refetched to fold the new state in.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::OrderCache;
use crate::error::{ValidationError, WorkflowError};
use crate::model::OrderStatus;
use crate::service::{OrderService, StatusAction};

pub struct DispatchWorkflow<S> {
    service: Arc<S>,
}

impl<S: OrderService> DispatchWorkflow<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Transition a PROCESO order to ENVIADO.
    pub async fn dispatch(
        &self,
        cache: &mut OrderCache,
        order_id: &str,
    ) -> Result<(), WorkflowError> {
        let order = cache
            .get(order_id)
            .ok_or_else(|| ValidationError::UnknownOrder {
                id: order_id.to_string(),
            })?;
        if order.status != OrderStatus::Proceso {
            return Err(ValidationError::NotInProcess {
                id: order.id.clone(),
                status: order.status.to_string(),
            }
            .into());
        }

        self.service
            .submit_status(order_id, &StatusAction::Enviar)
            .await?;
        info!(order_id, "order dispatched");

        match self.service.fetch_active().await {
            Ok(payloads) => cache.apply_active_snapshot(&payloads),
            Err(e) => warn!(
                error = %e,
                "active refresh after dispatch failed; cache is stale until the next sync"
            ),
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
