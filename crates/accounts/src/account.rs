use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankline_core::{AccountId, CustomerId, LedgerError, Money};

/// Kind of account a customer can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Saving,
    Checking,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Saving => "saving",
            AccountType::Checking => "checking",
        }
    }
}

impl core::fmt::Display for AccountType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "saving" => Ok(AccountType::Saving),
            "checking" => Ok(AccountType::Checking),
            other => Err(LedgerError::validation(format!(
                "account type must be one of: saving, checking (got '{other}')"
            ))),
        }
    }
}

/// A customer's account as persisted.
///
/// `balance` always equals the sum of the account's transaction deltas,
/// including the opening deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub balance: Money,
    pub opened_at: DateTime<Utc>,
}

impl Account {
    pub fn is_owned_by(&self, customer_id: CustomerId) -> bool {
        self.customer_id == customer_id
    }
}

/// An account that has passed validation but has no store-assigned id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub opening_balance: Money,
    pub opened_at: DateTime<Utc>,
}

impl NewAccount {
    /// Materialize the account once the store has assigned its id.
    pub fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            customer_id: self.customer_id,
            account_type: self.account_type,
            balance: self.opening_balance,
            opened_at: self.opened_at,
        }
    }
}
