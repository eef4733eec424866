//! Ledger error model.

use thiserror::Error;

use crate::money::Money;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Every layer speaks this taxonomy: the repository translates store failures
/// into it, the service adds business-rule failures, and the transport maps
/// each kind onto a status code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown customer or account.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is authenticated but does not own the resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A withdrawal would take the balance below zero.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    /// Transient store contention (lock wait timeout, deadlock, pool exhausted).
    ///
    /// Never leaves the service. Transactions retry it; every other
    /// operation, and a transaction out of attempts, reports `Unexpected`.
    #[error("store contention: {0}")]
    Contention(String),

    /// Store or driver fault. The message is for server-side logs only.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn contention(msg: impl Into<String>) -> Self {
        Self::Contention(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    pub fn customer_not_found() -> Self {
        Self::NotFound("customer")
    }

    pub fn account_not_found() -> Self {
        Self::NotFound("account")
    }

    /// Whether retrying the whole operation from a fresh read may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Contention(_))
    }
}
