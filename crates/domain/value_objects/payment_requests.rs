use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Document whose creation triggers a charge. `id` is the caller-chosen
/// reference id, distinct from the key the document is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub id: String,
    pub customer_id: String,
    /// Smallest currency unit.
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentRequestViolation {
    #[error("reference id is required")]
    MissingReferenceId,
    #[error("customerId is required")]
    MissingCustomerId,
    #[error("amount must be greater than zero (got {0})")]
    NonPositiveAmount(i64),
}

impl PaymentRequest {
    pub fn validate(&self) -> Result<(), PaymentRequestViolation> {
        if self.id.trim().is_empty() {
            return Err(PaymentRequestViolation::MissingReferenceId);
        }
        if self.customer_id.trim().is_empty() {
            return Err(PaymentRequestViolation::MissingCustomerId);
        }
        if self.amount <= 0 {
            return Err(PaymentRequestViolation::NonPositiveAmount(self.amount));
        }
        Ok(())
    }

    /// Stable per reference id, so a redelivered request reuses the charge
    /// the processor already created.
    pub fn idempotency_key(&self) -> String {
        format!("payment-request-{}", self.id)
    }
}
