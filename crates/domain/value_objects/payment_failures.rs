use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::enums::failure_reasons::FailureReason;

/// Dead-letter entry for a payment request that produced no charge outcome.
/// Stored outside the payments collection so the reference id never carries
/// a failure document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailureRecord {
    pub reference_id: String,
    pub document_id: String,
    pub customer_id: Option<String>,
    pub amount: Option<i64>,
    pub reason: FailureReason,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}
