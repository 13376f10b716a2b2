use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::usecases::payment_requests::PaymentRequestError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<PaymentRequestError> for AppError {
    fn from(err: PaymentRequestError) -> Self {
        match err {
            PaymentRequestError::Invalid(violation) => AppError::BadRequest(violation.to_string()),
            PaymentRequestError::NotFound(_) => AppError::NotFound(err.to_string()),
            PaymentRequestError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            // Internal detail stays in the logs.
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}
