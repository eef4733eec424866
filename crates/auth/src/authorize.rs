use thiserror::Error;

use bankline_core::CustomerId;

use crate::{Caller, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: caller may not act for customer {0}")]
    Forbidden(CustomerId),
    #[error("forbidden: admin role required")]
    AdminOnly,
}

/// Decide whether `caller` may act on resources of `customer_id`.
///
/// - No IO
/// - Admins may act for anyone
/// - Users only for the customer their token is bound to
pub fn authorize_customer(caller: &Caller, customer_id: CustomerId) -> Result<(), AuthzError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::User if caller.customer_id == Some(customer_id) => Ok(()),
        Role::User => Err(AuthzError::Forbidden(customer_id)),
    }
}

/// Gate for listings that span customers.
pub fn require_admin(caller: &Caller) -> Result<(), AuthzError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::User => Err(AuthzError::AdminOnly),
    }
}
