//! Client for the external identity service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use bankline_core::CustomerId;

use crate::{AuthError, Caller, Role, TokenVerifier};

/// Verifies tokens with `GET {base_url}/auth/verify?token=...`.
///
/// The service answers `{"is_authorized": bool, "role": "admin"|"user",
/// "customer_id": "2"}`; `customer_id` is required for users and may be a
/// string or a number.
#[derive(Debug, Clone)]
pub struct RemoteTokenVerifier {
    client: reqwest::Client,
    verify_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    is_authorized: bool,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    customer_id: Option<Value>,
}

impl RemoteTokenVerifier {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Unavailable(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            verify_url: format!("{}/auth/verify", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl TokenVerifier for RemoteTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        let resp = self
            .client
            .get(&self.verify_url)
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "identity service unreachable");
                AuthError::Unavailable(e.to_string())
            })?;

        match resp.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(AuthError::InvalidToken),
            status => {
                warn!(%status, "identity service returned an error");
                return Err(AuthError::Unavailable(format!("identity service returned {status}")));
            }
        }

        let body: VerifyResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("malformed identity response: {e}")))?;

        let caller = caller_from(body)?;
        debug!(role = %caller.role, "token verified");
        Ok(caller)
    }
}

fn caller_from(body: VerifyResponse) -> Result<Caller, AuthError> {
    if !body.is_authorized {
        return Err(AuthError::InvalidToken);
    }

    match body.role {
        Some(Role::Admin) => Ok(Caller::admin()),
        Some(Role::User) => {
            let customer_id = match body.customer_id {
                Some(Value::String(s)) => s.parse::<CustomerId>().ok(),
                Some(Value::Number(n)) => n.as_i64().filter(|v| *v > 0).map(CustomerId::new),
                _ => None,
            }
            .ok_or_else(|| AuthError::Unavailable("user token without a valid customer_id".to_string()))?;
            Ok(Caller::user(customer_id))
        }
        None => Err(AuthError::Unavailable("identity response without a role".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Caller, AuthError> {
        caller_from(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn user_response_binds_customer_id() {
        let caller = parse(json!({"is_authorized": true, "role": "user", "customer_id": "2"})).unwrap();
        assert_eq!(caller, Caller::user(CustomerId::new(2)));

        let numeric = parse(json!({"is_authorized": true, "role": "user", "customer_id": 7})).unwrap();
        assert_eq!(numeric, Caller::user(CustomerId::new(7)));
    }

    #[test]
    fn admin_response_needs_no_customer() {
        let caller = parse(json!({"is_authorized": true, "role": "admin"})).unwrap();
        assert!(caller.is_admin());
    }

    #[test]
    fn unauthorized_response_is_an_invalid_token() {
        assert_eq!(parse(json!({"is_authorized": false})), Err(AuthError::InvalidToken));
    }

    #[test]
    fn user_without_customer_is_a_service_fault() {
        let err = parse(json!({"is_authorized": true, "role": "user", "customer_id": ""})).unwrap_err();
        assert!(matches!(err, AuthError::Unavailable(_)));
    }
}
