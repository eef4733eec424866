//! Strongly-typed identifiers used across the ledger.
//!
//! Identifiers are assigned by the relational store (`BIGSERIAL`), so they
//! wrap a positive `i64` rather than a client-generated UUID.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Identifier of a customer (ownership anchor for accounts).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

/// Identifier of an account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

/// Identifier of a ledger transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.parse::<i64>() {
                    Ok(v) if v > 0 => Ok(Self(v)),
                    _ => Err(LedgerError::validation(format!("invalid {}: '{}'", $name, s))),
                }
            }
        }
    };
}

impl_serial_newtype!(CustomerId, "customer id");
impl_serial_newtype!(AccountId, "account id");
impl_serial_newtype!(TransactionId, "transaction id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_numeric_ids() {
        assert_eq!("1977".parse::<AccountId>().unwrap(), AccountId::new(1977));
        assert_eq!(CustomerId::new(2).to_string(), "2");
    }

    #[test]
    fn rejects_zero_negative_and_non_numeric() {
        for raw in ["0", "-4", "abc", "", "12a"] {
            let err = raw.parse::<CustomerId>().unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)), "{raw}: {err:?}");
        }
    }
}
