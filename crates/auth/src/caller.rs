use serde::{Deserialize, Serialize};

use bankline_core::CustomerId;

use crate::Role;

/// The authenticated identity behind a request.
///
/// Built by a `TokenVerifier`; a `User` always carries the customer id it
/// is bound to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub role: Role,
    pub customer_id: Option<CustomerId>,
}

impl Caller {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            customer_id: None,
        }
    }

    pub fn user(customer_id: CustomerId) -> Self {
        Self {
            role: Role::User,
            customer_id: Some(customer_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
