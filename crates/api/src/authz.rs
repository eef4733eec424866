//! API-side access guards.
//!
//! The ownership guard runs on every route carrying a customer id in its
//! path, before the ledger is called.

use tracing::warn;

use bankline_auth::{AuthzError, authorize_customer, require_admin};
use bankline_core::CustomerId;

use crate::context::CallerContext;

/// Check that the caller may act for the customer named in the path.
pub fn authorize_path_customer(ctx: &CallerContext, customer_id: CustomerId) -> Result<(), AuthzError> {
    authorize_customer(ctx.caller(), customer_id).inspect_err(|e| {
        warn!(
            role = %ctx.caller().role,
            caller_customer = ?ctx.caller().customer_id,
            error = %e,
            "access denied"
        );
    })
}

/// Check that the caller may list across customers.
pub fn authorize_admin(ctx: &CallerContext) -> Result<(), AuthzError> {
    require_admin(ctx.caller()).inspect_err(|e| {
        warn!(
            role = %ctx.caller().role,
            caller_customer = ?ctx.caller().customer_id,
            error = %e,
            "access denied"
        );
    })
}
