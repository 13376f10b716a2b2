use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Why a payment request ended without an outcome document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidRequest,
    CustomerNotFound,
    NoDefaultSource,
    ChargeRejected,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidRequest => "invalid_request",
            FailureReason::CustomerNotFound => "customer_not_found",
            FailureReason::NoDefaultSource => "no_default_source",
            FailureReason::ChargeRejected => "charge_rejected",
        }
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
