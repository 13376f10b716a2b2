use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;

pub async fn not_found() -> impl IntoResponse {
    info!("worker router: not_found handler invoked");
    (StatusCode::NOT_FOUND, "NOT_FOUND").into_response()
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "success" }))).into_response()
}
