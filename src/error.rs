//! Error taxonomy for the order lifecycle core.
//!
//! Three families, none of them fatal to the process:
//!
//! - [`ValidationError`] — a local precondition failed (sum mismatch, missing
//!   client for credit, invalid transition). Never sent to the server; the
//!   operator corrects the input and retries.
//! - [`ServiceError`] — the order service refused an action, or the transport
//!   failed. The cache is left at its last known state.
//! - [`WorkflowError`] — what settlement, cancellation and dispatch return:
//!   either of the above.

use thiserror::Error;

/// Local precondition failures. Detected before any network call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Entered amounts do not sum exactly to the order total.
    #[error("payment sum {entered:.2} does not match order total {total:.2}")]
    SumMismatch { entered: f64, total: f64 },

    /// Credit-account settlement on an order with no resolvable client.
    #[error("order has no client assigned for a credit-account settlement")]
    MissingCreditClient,

    /// A credit-account payment must be the only entry in the list.
    #[error("credit account is exclusive: it cannot be combined with other payments")]
    MixedCreditPayments,

    /// A split settlement takes one or two non-credit payment entries.
    #[error("expected one or two payment entries, got {count}")]
    BadSplitShape { count: usize },

    /// The order is in a terminal state and no transition may leave it.
    #[error("order {id} is already {status}")]
    TerminalState { id: String, status: String },

    /// Dispatch is only valid from PROCESO.
    #[error("order {id} is {status}, expected PROCESO")]
    NotInProcess { id: String, status: String },

    /// The order id is not present in the cache.
    #[error("order {id} is not in the local cache")]
    UnknownOrder { id: String },
}

/// Failures at the order-service boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The service answered and refused the request (stale order, server-side
    /// business rule, auth). The operator may retry.
    #[error("order service rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network or connection fault. The last fetched state stays valid.
    #[error("{0}")]
    Transport(String),
}

/// Error surface of the mutation workflows (settle, cancel, dispatch).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl WorkflowError {
    /// True for input errors the operator can fix locally. Callers keep the
    /// entered form state in this case instead of resetting it.
    pub fn is_validation(&self) -> bool {
        matches!(self, WorkflowError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_amounts() {
        let err = ValidationError::SumMismatch {
            entered: 99.0,
            total: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "payment sum 99.00 does not match order total 100.00"
        );
    }

    #[test]
    fn test_workflow_error_classification() {
        let local: WorkflowError = ValidationError::MissingCreditClient.into();
        assert!(local.is_validation());

        let remote: WorkflowError = ServiceError::Rejected {
            status: 409,
            message: "stale order".into(),
        }
        .into();
        assert!(!remote.is_validation());
    }
}
