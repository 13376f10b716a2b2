use std::sync::Arc;

use chrono::Utc;
use crates::{
    domain::{
        repositories::payments::PaymentDocumentRepository,
        value_objects::{
            charge_outcomes::ChargeOutcome, enums::failure_reasons::FailureReason,
            payment_failures::PaymentFailureRecord, payment_requests::PaymentRequest,
        },
    },
    payments::{
        gateway::PaymentGateway,
        stripe_client::{NewCharge, StripeError},
    },
};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors worth redelivering the event for. Domain failures are not errors:
/// they end in a [`ChargeDisposition`] and a failure record.
#[derive(Debug, Error)]
pub enum ChargeError {
    #[error("document store error: {0}")]
    Storage(anyhow::Error),
    #[error("payment processor error: {0}")]
    Processor(StripeError),
}

pub type UseCaseResult<T> = std::result::Result<T, ChargeError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeDisposition {
    /// An outcome document was written; `status` is the processor's status.
    Charged { reference_id: String, status: String },
    AlreadyProcessed { reference_id: String },
    InvalidRequest { reference_id: String },
    CustomerNotFound { reference_id: String },
    NoDefaultSource { reference_id: String },
    Rejected { reference_id: String },
}

pub struct ChargeWorkflowUseCase<P, G>
where
    P: PaymentDocumentRepository + 'static,
    G: PaymentGateway + 'static,
{
    payment_repo: Arc<P>,
    gateway: Arc<G>,
    currency: String,
}

impl<P, G> ChargeWorkflowUseCase<P, G>
where
    P: PaymentDocumentRepository + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(payment_repo: Arc<P>, gateway: Arc<G>, currency: String) -> Self {
        Self {
            payment_repo,
            gateway,
            currency,
        }
    }

    /// Runs one newly created payment request document through to an outcome.
    pub async fn handle_created_document(
        &self,
        document_id: &str,
        body: Value,
    ) -> UseCaseResult<ChargeDisposition> {
        let fallback_reference = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(document_id)
            .to_string();

        let request = match serde_json::from_value::<PaymentRequest>(body) {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    %document_id,
                    reference_id = %fallback_reference,
                    error = %err,
                    "charge: payment request document could not be decoded"
                );
                self.record_failure(
                    PaymentFailureDraft::new(&fallback_reference, document_id),
                    FailureReason::InvalidRequest,
                    err.to_string(),
                )
                .await?;
                return Ok(ChargeDisposition::InvalidRequest {
                    reference_id: fallback_reference,
                });
            }
        };

        if let Err(violation) = request.validate() {
            warn!(
                %document_id,
                reference_id = %fallback_reference,
                reason = %violation,
                "charge: payment request is invalid"
            );
            self.record_failure(
                PaymentFailureDraft::from_request(&request, &fallback_reference, document_id),
                FailureReason::InvalidRequest,
                violation.to_string(),
            )
            .await?;
            return Ok(ChargeDisposition::InvalidRequest {
                reference_id: fallback_reference,
            });
        }

        let reference_id = request.id.clone();
        let customer_id = request.customer_id.clone();
        let draft = PaymentFailureDraft::from_request(&request, &reference_id, document_id);

        let existing = self
            .payment_repo
            .find_outcome(&reference_id)
            .await
            .map_err(|err| {
                error!(%reference_id, db_error = ?err, "charge: failed to look up outcome");
                ChargeError::Storage(err)
            })?;
        if existing.is_some() {
            info!(%reference_id, %document_id, "charge: outcome already recorded, skipping");
            return Ok(ChargeDisposition::AlreadyProcessed { reference_id });
        }

        let customer = self
            .gateway
            .retrieve_customer(&customer_id)
            .await
            .map_err(|err| {
                error!(%reference_id, %customer_id, error = ?err, "charge: customer lookup failed");
                ChargeError::Processor(err)
            })?;
        let Some(customer) = customer else {
            warn!(%reference_id, %customer_id, "charge: customer not found");
            self.record_failure(
                draft,
                FailureReason::CustomerNotFound,
                format!("customer {customer_id} not found"),
            )
            .await?;
            return Ok(ChargeDisposition::CustomerNotFound { reference_id });
        };

        let Some(source) = customer.default_source else {
            warn!(%reference_id, %customer_id, "charge: customer has no default source");
            self.record_failure(
                draft,
                FailureReason::NoDefaultSource,
                format!("customer {customer_id} has no default source"),
            )
            .await?;
            return Ok(ChargeDisposition::NoDefaultSource { reference_id });
        };

        let new_charge = NewCharge {
            amount: request.amount,
            currency: self.currency.clone(),
            customer_id: customer_id.clone(),
            source,
            description: request.description.clone(),
            idempotency_key: request.idempotency_key(),
        };
        let charge = match self.gateway.create_charge(new_charge).await {
            Ok(charge) => charge,
            Err(err) if err.is_retryable() => {
                error!(
                    %reference_id,
                    %customer_id,
                    error = ?err,
                    "charge: processor unavailable, charge will be retried"
                );
                return Err(ChargeError::Processor(err));
            }
            Err(err) => {
                error!(%reference_id, %customer_id, error = ?err, "charge: processor rejected charge");
                self.record_failure(draft, FailureReason::ChargeRejected, err.to_string())
                    .await?;
                return Ok(ChargeDisposition::Rejected { reference_id });
            }
        };

        let outcome = ChargeOutcome::from(&charge);
        let status = outcome.status.clone();
        self.payment_repo
            .write_outcome(&reference_id, outcome)
            .await
            .map_err(|err| {
                error!(
                    %reference_id,
                    charge_id = %charge.id,
                    db_error = ?err,
                    "charge: failed to write outcome"
                );
                ChargeError::Storage(err)
            })?;

        info!(
            %reference_id,
            charge_id = %charge.id,
            amount = charge.amount,
            %status,
            "charge: outcome recorded"
        );
        Ok(ChargeDisposition::Charged {
            reference_id,
            status,
        })
    }

    async fn record_failure(
        &self,
        draft: PaymentFailureDraft,
        reason: FailureReason,
        error: String,
    ) -> UseCaseResult<()> {
        let reference_id = draft.reference_id.clone();
        let record = PaymentFailureRecord {
            reference_id: draft.reference_id,
            document_id: draft.document_id,
            customer_id: draft.customer_id,
            amount: draft.amount,
            reason,
            error,
            failed_at: Utc::now(),
        };

        self.payment_repo
            .record_failure(record)
            .await
            .map_err(|err| {
                error!(%reference_id, %reason, db_error = ?err, "charge: failed to record failure");
                ChargeError::Storage(err)
            })
    }
}

struct PaymentFailureDraft {
    reference_id: String,
    document_id: String,
    customer_id: Option<String>,
    amount: Option<i64>,
}

impl PaymentFailureDraft {
    fn new(reference_id: &str, document_id: &str) -> Self {
        Self {
            reference_id: reference_id.to_string(),
            document_id: document_id.to_string(),
            customer_id: None,
            amount: None,
        }
    }

    fn from_request(request: &PaymentRequest, reference_id: &str, document_id: &str) -> Self {
        Self {
            customer_id: Some(request.customer_id.clone()).filter(|id| !id.trim().is_empty()),
            amount: Some(request.amount),
            ..Self::new(reference_id, document_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::{
        domain::{
            repositories::payments::MockPaymentDocumentRepository,
            value_objects::enums::charge_statuses::ChargeStatus,
        },
        payments::{
            gateway::MockPaymentGateway,
            stripe_client::{StripeCharge, StripeCustomer},
        },
    };
    use serde_json::json;

    fn customer(id: &str, default_source: Option<&str>) -> StripeCustomer {
        StripeCustomer {
            id: id.to_string(),
            email: None,
            default_source: default_source.map(str::to_string),
            deleted: false,
        }
    }

    fn charge(status: ChargeStatus) -> StripeCharge {
        StripeCharge {
            id: "ch_1".to_string(),
            amount: 500,
            description: Some("order".to_string()),
            outcome: Some(json!({ "type": "authorized" })),
            paid: status.is_succeeded(),
            payment_intent: Some("pi_1".to_string()),
            payment_method: Some("card_1".to_string()),
            receipt_url: None,
            status,
            source: Some(json!({ "id": "card_1" })),
        }
    }

    fn api_error(status: u16, message: &str) -> StripeError {
        StripeError::Api {
            context: "create charge",
            status,
            message: message.to_string(),
        }
    }

    fn gateway_charging(
        result: fn() -> Result<StripeCharge, StripeError>,
    ) -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_customer()
            .returning(|_| Ok(Some(customer("cus_123", Some("card_1")))));
        gateway
            .expect_create_charge()
            .times(1)
            .returning(move |_| result());
        gateway
    }

    fn r1() -> Value {
        json!({ "id": "r1", "customerId": "cus_123", "amount": 500, "description": "order" })
    }

    fn usecase(
        repo: MockPaymentDocumentRepository,
        gateway: MockPaymentGateway,
    ) -> ChargeWorkflowUseCase<MockPaymentDocumentRepository, MockPaymentGateway> {
        ChargeWorkflowUseCase::new(Arc::new(repo), Arc::new(gateway), "usd".to_string())
    }

    #[tokio::test]
    async fn succeeded_charge_writes_full_outcome_at_reference_id() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().times(1).returning(|_| Ok(None));
        repo.expect_write_outcome()
            .times(1)
            .withf(|reference_id: &str, outcome: &ChargeOutcome| {
                reference_id == "r1"
                    && outcome.charge_id == "ch_1"
                    && outcome.amount == 500
                    && outcome.status == "succeeded"
                    && outcome.is_succeeded()
            })
            .returning(|_, _| Ok(()));
        repo.expect_record_failure().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_customer()
            .times(1)
            .withf(|customer_id: &str| customer_id == "cus_123")
            .returning(|_| Ok(Some(customer("cus_123", Some("card_1")))));
        gateway
            .expect_create_charge()
            .times(1)
            .withf(|charge: &NewCharge| {
                charge.amount == 500
                    && charge.currency == "usd"
                    && charge.source == "card_1"
                    && charge.customer_id == "cus_123"
                    && charge.description.as_deref() == Some("order")
                    && charge.idempotency_key == "payment-request-r1"
            })
            .returning(|_| Ok(charge(ChargeStatus::Succeeded)));

        let disposition = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap();

        assert_eq!(
            disposition,
            ChargeDisposition::Charged {
                reference_id: "r1".to_string(),
                status: "succeeded".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn pending_charge_writes_reduced_outcome() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_write_outcome()
            .times(1)
            .withf(|_: &str, outcome: &ChargeOutcome| {
                outcome.status == "pending" && outcome.payment_references.is_none()
            })
            .returning(|_, _| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_customer()
            .returning(|_| Ok(Some(customer("cus_123", Some("card_1")))));
        gateway
            .expect_create_charge()
            .returning(|_| Ok(charge(ChargeStatus::Pending)));

        let disposition = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap();

        assert!(matches!(disposition, ChargeDisposition::Charged { status, .. } if status == "pending"));
    }

    #[tokio::test]
    async fn unknown_customer_writes_no_outcome() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_write_outcome().never();
        repo.expect_record_failure()
            .times(1)
            .withf(|failure: &PaymentFailureRecord| {
                failure.reference_id == "r2"
                    && failure.document_id == "doc-2"
                    && failure.customer_id.as_deref() == Some("cus_999")
                    && failure.amount == Some(1000)
                    && failure.reason == FailureReason::CustomerNotFound
            })
            .returning(|_| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_retrieve_customer().times(1).returning(|_| Ok(None));
        gateway.expect_create_charge().never();

        let disposition = usecase(repo, gateway)
            .handle_created_document(
                "doc-2",
                json!({ "id": "r2", "customerId": "cus_999", "amount": 1000 }),
            )
            .await
            .unwrap();

        assert_eq!(
            disposition,
            ChargeDisposition::CustomerNotFound {
                reference_id: "r2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn customer_without_default_source_is_not_charged() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_write_outcome().never();
        repo.expect_record_failure()
            .times(1)
            .withf(|failure: &PaymentFailureRecord| {
                failure.reason == FailureReason::NoDefaultSource
            })
            .returning(|_| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_customer()
            .returning(|_| Ok(Some(customer("cus_123", None))));
        gateway.expect_create_charge().never();

        let disposition = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap();

        assert!(matches!(disposition, ChargeDisposition::NoDefaultSource { .. }));
    }

    #[tokio::test]
    async fn rejected_charge_is_dead_lettered() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_write_outcome().never();
        repo.expect_record_failure()
            .times(1)
            .withf(|failure: &PaymentFailureRecord| {
                failure.reason == FailureReason::ChargeRejected
                    && failure.error.contains("No such source")
            })
            .returning(|_| Ok(()));

        let gateway = gateway_charging(|| Err(api_error(400, "No such source")));

        let disposition = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap();

        assert!(matches!(disposition, ChargeDisposition::Rejected { .. }));
    }

    #[tokio::test]
    async fn declined_card_is_dead_lettered() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_write_outcome().never();
        repo.expect_record_failure()
            .times(1)
            .withf(|failure: &PaymentFailureRecord| {
                failure.reason == FailureReason::ChargeRejected
                    && failure.error.contains("Your card was declined.")
            })
            .returning(|_| Ok(()));

        let gateway = gateway_charging(|| Err(api_error(402, "Your card was declined.")));

        let disposition = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap();

        assert_eq!(
            disposition,
            ChargeDisposition::Rejected {
                reference_id: "r1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn processor_server_error_on_charge_is_retryable() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_record_failure().never();
        repo.expect_write_outcome().never();

        let gateway = gateway_charging(|| Err(api_error(503, "upstream unavailable")));

        let err = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ChargeError::Processor(StripeError::Api { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn rate_limited_charge_is_retryable() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_record_failure().never();
        repo.expect_write_outcome().never();

        let gateway = gateway_charging(|| Err(api_error(429, "Too many requests")));

        let err = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap_err();

        assert!(matches!(err, ChargeError::Processor(ref e) if e.is_retryable()));
        assert!(err.to_string().contains("status 429"));
    }

    #[tokio::test]
    async fn existing_outcome_skips_processor() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome()
            .times(1)
            .returning(|_| Ok(Some(json!({ "chargeId": "ch_1" }))));
        repo.expect_write_outcome().never();

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_retrieve_customer().never();
        gateway.expect_create_charge().never();

        let disposition = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap();

        assert!(matches!(disposition, ChargeDisposition::AlreadyProcessed { .. }));
    }

    #[tokio::test]
    async fn malformed_document_is_recorded_under_its_id() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().never();
        repo.expect_record_failure()
            .times(1)
            .withf(|failure: &PaymentFailureRecord| {
                failure.reference_id == "r3"
                    && failure.reason == FailureReason::InvalidRequest
                    && failure.amount.is_none()
            })
            .returning(|_| Ok(()));

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_retrieve_customer().never();

        let disposition = usecase(repo, gateway)
            .handle_created_document(
                "doc-3",
                json!({ "id": "r3", "customerId": "cus_1", "amount": "five" }),
            )
            .await
            .unwrap();

        assert!(matches!(disposition, ChargeDisposition::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn customer_lookup_outage_is_retryable() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_record_failure().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_retrieve_customer()
            .returning(|_| {
                Err(StripeError::Api {
                    context: "retrieve customer",
                    status: 503,
                    message: "upstream unavailable".to_string(),
                })
            });

        let err = usecase(repo, gateway)
            .handle_created_document("doc-1", r1())
            .await
            .unwrap_err();

        assert!(matches!(err, ChargeError::Processor(_)));
    }
}
