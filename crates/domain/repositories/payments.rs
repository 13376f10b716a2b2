use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

use crate::domain::value_objects::{
    charge_outcomes::ChargeOutcome, payment_failures::PaymentFailureRecord,
    payment_requests::PaymentRequest,
};

#[automock]
#[async_trait]
pub trait PaymentDocumentRepository: Send + Sync {
    /// Stores the request under a fresh system key and queues its create
    /// event. Returns the key.
    async fn add_payment_request(&self, request: PaymentRequest) -> Result<String>;

    async fn find_payment_document(&self, document_id: &str) -> Result<Option<Value>>;

    async fn find_outcome(&self, reference_id: &str) -> Result<Option<Value>>;

    /// Full overwrite of the document at the reference id.
    async fn write_outcome(&self, reference_id: &str, outcome: ChargeOutcome) -> Result<()>;

    async fn find_failure(&self, reference_id: &str) -> Result<Option<Value>>;

    async fn record_failure(&self, failure: PaymentFailureRecord) -> Result<()>;
}
