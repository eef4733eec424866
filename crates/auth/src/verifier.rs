use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::Caller;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is unknown, expired, or rejected by the identity service.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The identity service could not give an answer.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a bearer token into the caller behind it.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Caller, AuthError>;
}

#[async_trait]
impl<V> TokenVerifier for Arc<V>
where
    V: TokenVerifier + ?Sized,
{
    async fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        (**self).verify(token).await
    }
}

/// Fixed token table, for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Caller>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, caller: Caller) -> Self {
        self.tokens.insert(token.into(), caller);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        self.tokens.get(token).copied().ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankline_core::CustomerId;

    #[tokio::test]
    async fn static_verifier_resolves_known_tokens_only() {
        let verifier = StaticTokenVerifier::new()
            .with_token("admin-token", Caller::admin())
            .with_token("user-2", Caller::user(CustomerId::new(2)));

        assert_eq!(verifier.verify("admin-token").await, Ok(Caller::admin()));
        assert_eq!(verifier.verify("user-2").await, Ok(Caller::user(CustomerId::new(2))));
        assert_eq!(verifier.verify("forged").await, Err(AuthError::InvalidToken));
    }
}
