use std::sync::Arc;

use crates::domain::{
    repositories::payments::PaymentDocumentRepository,
    value_objects::payment_requests::{PaymentRequest, PaymentRequestViolation},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PaymentRequestError {
    #[error(transparent)]
    Invalid(#[from] PaymentRequestViolation),
    #[error("no outcome or failure recorded for reference id {0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentRequestError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentRequestError::Invalid(_) => StatusCode::BAD_REQUEST,
            PaymentRequestError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentRequestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentRequestError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusDto {
    pub reference_id: String,
    pub outcome: Option<Value>,
    pub failure: Option<Value>,
}

pub struct PaymentRequestUseCase<P>
where
    P: PaymentDocumentRepository + 'static,
{
    payment_repo: Arc<P>,
}

impl<P> PaymentRequestUseCase<P>
where
    P: PaymentDocumentRepository + 'static,
{
    pub fn new(payment_repo: Arc<P>) -> Self {
        Self { payment_repo }
    }

    /// Stores a validated request, which queues it for charging. Returns the
    /// generated document id.
    pub async fn submit(&self, request: PaymentRequest) -> UseCaseResult<String> {
        if let Err(violation) = request.validate() {
            warn!(
                reference_id = %request.id,
                reason = %violation,
                "payment requests: rejected invalid request"
            );
            return Err(violation.into());
        }

        let reference_id = request.id.clone();
        let document_id = self
            .payment_repo
            .add_payment_request(request)
            .await
            .map_err(|err| {
                error!(%reference_id, db_error = ?err, "payment requests: failed to store request");
                PaymentRequestError::Internal(err)
            })?;

        info!(%reference_id, %document_id, "payment requests: request queued");
        Ok(document_id)
    }

    pub async fn status(&self, reference_id: &str) -> UseCaseResult<PaymentStatusDto> {
        let outcome = self.payment_repo.find_outcome(reference_id).await?;
        let failure = self.payment_repo.find_failure(reference_id).await?;

        if outcome.is_none() && failure.is_none() {
            return Err(PaymentRequestError::NotFound(reference_id.to_string()));
        }

        Ok(PaymentStatusDto {
            reference_id: reference_id.to_string(),
            outcome,
            failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crates::domain::repositories::payments::MockPaymentDocumentRepository;
    use serde_json::json;

    fn request(id: &str, customer_id: &str, amount: i64) -> PaymentRequest {
        PaymentRequest {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            amount,
            description: Some("order".to_string()),
        }
    }

    #[tokio::test]
    async fn valid_request_is_added_to_payments() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_add_payment_request()
            .times(1)
            .withf(|request: &PaymentRequest| request.id == "r1" && request.amount == 500)
            .returning(|_| Ok("6f1c2f0e-doc".to_string()));

        let usecase = PaymentRequestUseCase::new(Arc::new(repo));
        let document_id = usecase.submit(request("r1", "cus_123", 500)).await.unwrap();

        assert_eq!(document_id, "6f1c2f0e-doc");
    }

    #[tokio::test]
    async fn invalid_request_is_never_stored() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_add_payment_request().never();

        let usecase = PaymentRequestUseCase::new(Arc::new(repo));
        let err = usecase.submit(request("r1", "cus_123", 0)).await.unwrap_err();

        assert!(matches!(
            err,
            PaymentRequestError::Invalid(PaymentRequestViolation::NonPositiveAmount(0))
        ));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_reports_outcome() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome()
            .times(1)
            .returning(|_| Ok(Some(json!({ "chargeId": "ch_1", "status": "succeeded" }))));
        repo.expect_find_failure().times(1).returning(|_| Ok(None));

        let usecase = PaymentRequestUseCase::new(Arc::new(repo));
        let status = usecase.status("r1").await.unwrap();

        assert_eq!(status.reference_id, "r1");
        assert_eq!(status.outcome.unwrap()["chargeId"], "ch_1");
        assert!(status.failure.is_none());
    }

    #[tokio::test]
    async fn status_without_records_is_not_found() {
        let mut repo = MockPaymentDocumentRepository::new();
        repo.expect_find_outcome().returning(|_| Ok(None));
        repo.expect_find_failure().returning(|_| Ok(None));

        let usecase = PaymentRequestUseCase::new(Arc::new(repo));
        let err = usecase.status("r2").await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
