use serde::Serialize;
use serde_json::Value;

use crate::payments::stripe_client::StripeCharge;

/// Normalized charge result written under the request's reference id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeOutcome {
    pub charge_id: String,
    pub amount: i64,
    pub description: Option<String>,
    pub outcome: Option<Value>,
    pub paid: bool,
    /// Present only for succeeded charges. The processor leaves these unset
    /// on any other status.
    #[serde(flatten)]
    pub payment_references: Option<PaymentReferences>,
    pub receipt_url: Option<String>,
    pub status: String,
    pub source: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReferences {
    pub payment_intent: Option<String>,
    pub payment_method: Option<String>,
}

impl ChargeOutcome {
    pub fn is_succeeded(&self) -> bool {
        self.payment_references.is_some()
    }
}

impl From<&StripeCharge> for ChargeOutcome {
    fn from(charge: &StripeCharge) -> Self {
        let payment_references = charge.status.is_succeeded().then(|| PaymentReferences {
            payment_intent: charge.payment_intent.clone(),
            payment_method: charge.payment_method.clone(),
        });

        Self {
            charge_id: charge.id.clone(),
            amount: charge.amount,
            description: charge.description.clone(),
            outcome: charge.outcome.clone(),
            paid: charge.paid,
            payment_references,
            receipt_url: charge.receipt_url.clone(),
            status: charge.status.to_string(),
            source: charge.source.clone(),
        }
    }
}
