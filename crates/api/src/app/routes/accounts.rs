use std::sync::Arc;

use axum::{
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use bankline_accounts::{AccountService, OpenAccountRequest, TransactionRequest};
use bankline_core::{AccountId, CustomerId};

use crate::app::{dto, errors};
use crate::authz::authorize_path_customer;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/:customer_id", get(list_accounts))
        .route("/:customer_id/account", post(open_account))
        .route("/:customer_id/account/:account_id", post(make_transaction))
}

pub async fn list_accounts(
    Extension(service): Extension<Arc<dyn AccountService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(customer_id): Path<String>,
) -> axum::response::Response {
    let customer_id = match guard_customer(&ctx, &customer_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.get_all_accounts(customer_id).await {
        Ok(accounts) => {
            let items = accounts.iter().map(dto::account_to_list_item).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn open_account(
    Extension(service): Extension<Arc<dyn AccountService>>,
    Extension(ctx): Extension<CallerContext>,
    Path(customer_id): Path<String>,
    body: Result<Json<dto::NewAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let customer_id = match guard_customer(&ctx, &customer_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let (account_type, amount) = match body.validate() {
        Ok(v) => v,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    let request = OpenAccountRequest {
        customer_id,
        account_type,
        amount,
    };
    match service.open_account(request).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(dto::NewAccountResponse {
                account_id: account.id.to_string(),
            }),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn make_transaction(
    Extension(service): Extension<Arc<dyn AccountService>>,
    Extension(ctx): Extension<CallerContext>,
    Path((customer_id, account_id)): Path<(String, String)>,
    body: Result<Json<dto::NewTransactionRequest>, JsonRejection>,
) -> axum::response::Response {
    let customer_id = match guard_customer(&ctx, &customer_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let account_id: AccountId = match account_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let (transaction_type, amount) = match body.validate() {
        Ok(v) => v,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    let request = TransactionRequest {
        account_id,
        customer_id,
        transaction_type,
        amount,
    };
    match service.make_transaction(request).await {
        Ok(receipt) => (StatusCode::CREATED, Json(dto::receipt_to_response(receipt))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Parse the path customer id and check the caller may act for it.
fn guard_customer(ctx: &CallerContext, raw: &str) -> Result<CustomerId, axum::response::Response> {
    let customer_id: CustomerId = raw.parse().map_err(errors::ledger_error_to_response)?;
    authorize_path_customer(ctx, customer_id).map_err(errors::authz_error_to_response)?;
    Ok(customer_id)
}
