use axum::{http::StatusCode, response::IntoResponse, Json};

/// Liveness check. Unauthenticated, touches no store.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
