use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use bankline_accounts::AccountService;

use crate::app::{dto, errors};
use crate::authz::authorize_admin;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new().route("/customers", get(list_customers))
}

/// Admin-only directory listing, optionally filtered by `status`.
pub async fn list_customers(
    Extension(service): Extension<Arc<dyn AccountService>>,
    Extension(ctx): Extension<CallerContext>,
    Query(query): Query<dto::CustomerQuery>,
) -> axum::response::Response {
    if let Err(e) = authorize_admin(&ctx) {
        return errors::authz_error_to_response(e);
    }
    let status = match query.status() {
        Ok(status) => status,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    match service.get_all_customers(status).await {
        Ok(customers) => {
            let items = customers.iter().map(dto::customer_to_response).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}
