//! Top-level wiring for one dashboard session.
//!
//! [`OrderDesk`] owns the cache, the order-service client and the mutation
//! workflows, and is the single surface presentation talks to. All cache
//! mutation flows through the operations here on one logical timeline — the
//! push channel and the periodic refreshes feed the same desk, and writes
//! are by-id replace/prepend, so last write wins per id with no locking
//! inside the cache.
//!
//! There is deliberately no request-generation guard on the two refresh
//! operations: a slow in-flight snapshot that resolves after a newer one can
//! overwrite it, last-resolved-wins. A production port should close that
//! race with a monotonic generation check here.

use std::sync::Arc;

use tracing::info;

use crate::cache::OrderCache;
use crate::cancellation::CancellationWorkflow;
use crate::dispatch::DispatchWorkflow;
use crate::error::{ServiceError, WorkflowError};
use crate::model::OrderRecord;
use crate::realtime::PushEvent;
use crate::service::OrderService;
use crate::settlement::{ProposedPayment, SettlementEngine, SettlementOutcome};

pub struct OrderDesk<S: OrderService> {
    cache: OrderCache,
    service: Arc<S>,
    settlement: SettlementEngine<S>,
    cancellation: CancellationWorkflow<S>,
    dispatch: DispatchWorkflow<S>,
}

impl<S: OrderService> OrderDesk<S> {
    pub fn new(service: S) -> Self {
        let service = Arc::new(service);
        Self {
            cache: OrderCache::new(),
            settlement: SettlementEngine::new(Arc::clone(&service)),
            cancellation: CancellationWorkflow::new(Arc::clone(&service)),
            dispatch: DispatchWorkflow::new(Arc::clone(&service)),
            service,
        }
    }

    /// The authoritative collection, for presentation to read.
    pub fn cache(&self) -> &OrderCache {
        &self.cache
    }

    /// Populate the desk on mount: both snapshot buckets, active first.
    pub async fn bootstrap(&mut self) -> Result<(), ServiceError> {
        self.refresh_active().await?;
        self.refresh_canceled().await?;
        info!(orders = self.cache.len(), "order desk bootstrapped");
        Ok(())
    }

    /// Refetch the active bucket. A failed fetch leaves the cache at its
    /// last known state — stale but consistent.
    pub async fn refresh_active(&mut self) -> Result<(), ServiceError> {
        let payloads = self.service.fetch_active().await?;
        self.cache.apply_active_snapshot(&payloads);
        Ok(())
    }

    /// Refetch the canceled bucket.
    pub async fn refresh_canceled(&mut self) -> Result<(), ServiceError> {
        let payloads = self.service.fetch_canceled().await?;
        self.cache.apply_canceled_snapshot(&payloads);
        Ok(())
    }

    /// Feed one normalized push event into the cache.
    pub fn apply_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Upsert(payload) => {
                self.cache.apply_event(&payload);
            }
        }
    }

    /// Settle an order; see [`SettlementEngine::settle`].
    pub async fn settle(
        &mut self,
        order_id: &str,
        proposed: &[ProposedPayment],
        print_requested: bool,
    ) -> Result<SettlementOutcome, WorkflowError> {
        self.settlement
            .settle(&mut self.cache, order_id, proposed, print_requested)
            .await
    }

    /// Cancel an order; see [`CancellationWorkflow::cancel`].
    pub async fn cancel(
        &mut self,
        order_id: &str,
        reason: &str,
    ) -> Result<OrderRecord, WorkflowError> {
        self.cancellation
            .cancel(&mut self.cache, order_id, reason)
            .await
    }

    /// Mark a PROCESO order as sent; see [`DispatchWorkflow::dispatch`].
    pub async fn mark_sent(&mut self, order_id: &str) -> Result<(), WorkflowError> {
        self.dispatch.dispatch(&mut self.cache, order_id).await
    }
}

// ===========================================================================
// Tests
// ===========================================================================
