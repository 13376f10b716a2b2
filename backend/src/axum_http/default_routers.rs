use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::info;

/// `{status: "success"}` or `{status: "error", error}` body shared by the
/// provisioning and diagnostic endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusBody {
    pub fn success() -> Self {
        Self {
            status: "success",
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            error: Some(message.into()),
        }
    }
}

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    (StatusCode::NOT_FOUND, "NOT_FOUND").into_response()
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(StatusBody::success())).into_response()
}
