use crate::{
    axum_http::error_responses::AppError,
    usecases::payment_requests::PaymentRequestUseCase,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::payments::PaymentDocumentRepository,
        value_objects::payment_requests::PaymentRequest,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::payments::PaymentDocumentPostgres,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestCreated {
    pub document_id: String,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let payment_repository = PaymentDocumentPostgres::new(Arc::clone(&db_pool));
    let usecase = PaymentRequestUseCase::new(Arc::new(payment_repository));

    Router::new()
        .route("/", post(submit_payment_request::<PaymentDocumentPostgres>))
        .route(
            "/:reference_id",
            get(payment_status::<PaymentDocumentPostgres>),
        )
        .with_state(Arc::new(usecase))
}

pub async fn submit_payment_request<P>(
    State(usecase): State<Arc<PaymentRequestUseCase<P>>>,
    Json(request): Json<PaymentRequest>,
) -> Response
where
    P: PaymentDocumentRepository + Send + Sync + 'static,
{
    info!(reference_id = %request.id, "payments: submit request received");
    match usecase.submit(request).await {
        Ok(document_id) => (
            StatusCode::CREATED,
            Json(PaymentRequestCreated { document_id }),
        )
            .into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn payment_status<P>(
    State(usecase): State<Arc<PaymentRequestUseCase<P>>>,
    Path(reference_id): Path<String>,
) -> Response
where
    P: PaymentDocumentRepository + Send + Sync + 'static,
{
    match usecase.status(&reference_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
