use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, warn};

use bankline_auth::AuthzError;
use bankline_core::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        LedgerError::InsufficientFunds { balance, requested } => json_error(
            StatusCode::BAD_REQUEST,
            "insufficient_funds",
            format!("insufficient funds: balance {balance}, requested {requested}"),
        ),
        LedgerError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        LedgerError::Unauthorized(msg) => json_error(StatusCode::FORBIDDEN, "unauthorized", msg),
        // Contention should have been absorbed by the service; treat a leak as a fault.
        LedgerError::Contention(cause) | LedgerError::Unexpected(cause) => {
            error!(%cause, "request failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "unexpected error",
            )
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "unauthorized", err.to_string())
}

/// Malformed or wrongly typed JSON bodies are client errors.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    warn!(error = %rejection.body_text(), "rejected request body");
    json_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
