use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankline_core::{AccountId, LedgerError, LedgerResult, Money, TransactionId};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }

    /// Balance after applying `amount` in this direction.
    ///
    /// Only arithmetic is checked here; whether the result is acceptable is a
    /// business rule decided by the service.
    pub fn apply(self, balance: Money, amount: Money) -> LedgerResult<Money> {
        match self {
            TransactionType::Deposit => balance.checked_add(amount),
            TransactionType::Withdrawal => balance.checked_sub(amount),
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            other => Err(LedgerError::validation(format!(
                "transaction type must be one of: deposit, withdrawal (got '{other}')"
            ))),
        }
    }
}

/// Append-only ledger entry (immutable once written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    /// Always strictly positive; the direction comes from `transaction_type`.
    pub amount: Money,
    pub resulting_balance: Money,
    pub timestamp: DateTime<Utc>,
}

/// A ledger entry decided against a locked account, not yet written.
///
/// `prior_balance` is the balance the decision was based on; the repository
/// refuses to write the posting if the locked row no longer carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub prior_balance: Money,
    pub resulting_balance: Money,
    pub occurred_at: DateTime<Utc>,
}

impl Posting {
    /// The deposit that funds a newly opened account.
    pub fn opening_deposit(amount: Money, occurred_at: DateTime<Utc>) -> Self {
        Self {
            transaction_type: TransactionType::Deposit,
            amount,
            prior_balance: Money::ZERO,
            resulting_balance: amount,
            occurred_at,
        }
    }

    pub fn into_transaction(self, id: TransactionId, account_id: AccountId) -> Transaction {
        Transaction {
            id,
            account_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            resulting_balance: self.resulting_balance,
            timestamp: self.occurred_at,
        }
    }
}

/// What the caller gets back from a successful transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_id: TransactionId,
    pub balance: Money,
}

impl From<&Transaction> for TransactionReceipt {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            balance: tx.resulting_balance,
        }
    }
}
