//! Handoff contract to the external ticket/receipt collaborator.
//!
//! This core never formats or prints anything. After a settlement is
//! accepted (and printing was requested) it emits a [`TicketRequest`]; the
//! receipt component owns layout and print dispatch from there.

use serde::Serialize;

use crate::model::{OrderRecord, PaymentMethod, PaymentRecord};

/// Receipt-generation request handed off after a successful settlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    /// The order as the operator saw it when confirming the payment.
    pub order_snapshot: OrderRecord,
    /// Human-readable summary of how the order was paid.
    pub resolved_payment_label: String,
}

/// Resolve the payment summary printed on the receipt: the credit label for
/// a credit settlement, otherwise the joined list of methods used.
pub fn payment_label(payments: &[PaymentRecord]) -> String {
    if payments.iter().any(|p| p.method.is_credit()) {
        return PaymentMethod::CuentaCorriente.as_str().to_string();
    }
    payments
        .iter()
        .map(|p| p.method.as_str())
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(method: PaymentMethod, amount: f64) -> PaymentRecord {
        PaymentRecord {
            method,
            amount,
            client: None,
        }
    }

    #[test]
    fn test_label_joins_split_methods() {
        let split = [
            payment(PaymentMethod::Efectivo, 60.0),
            payment(PaymentMethod::Transferencia, 40.0),
        ];
        assert_eq!(payment_label(&split), "EFECTIVO + TRANSFERENCIA");

        let single = [payment(PaymentMethod::Qr, 100.0)];
        assert_eq!(payment_label(&single), "QR");
    }

    #[test]
    fn test_label_for_credit() {
        let credit = [payment(PaymentMethod::CuentaCorriente, 100.0)];
        assert_eq!(payment_label(&credit), "CUENTA_CORRIENTE");
    }
}
