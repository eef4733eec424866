//! The ledger core: business rules over the account repository.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use bankline_core::{AccountId, CustomerId, LedgerError, LedgerResult, Money};

use crate::account::{Account, AccountType, NewAccount};
use crate::customer::{Customer, CustomerStatus};
use crate::repository::AccountRepository;
use crate::transaction::{Posting, Transaction, TransactionReceipt, TransactionType};

/// Tunable business and resilience rules of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Smallest amount an account can be opened with.
    pub minimum_opening_balance: Money,
    /// Attempts per transaction when the store reports contention.
    pub max_attempts: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff: Duration,
    /// Upper bound for one service call, including waits for a connection
    /// and for the row lock.
    pub deadline: Duration,
}

impl LedgerPolicy {
    pub const DEFAULT_MINIMUM_OPENING_BALANCE: Money = Money::from_cents(500_000);
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            minimum_opening_balance: Self::DEFAULT_MINIMUM_OPENING_BALANCE,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(25),
            deadline: Duration::from_secs(10),
        }
    }
}

/// Validated request to open an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAccountRequest {
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub amount: Money,
}

/// Validated request to post a deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRequest {
    pub account_id: AccountId,
    pub customer_id: CustomerId,
    pub transaction_type: TransactionType,
    pub amount: Money,
}

/// Ledger operations offered to the transport layer.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn open_account(&self, request: OpenAccountRequest) -> LedgerResult<Account>;

    async fn get_all_accounts(&self, customer_id: CustomerId) -> LedgerResult<Vec<Account>>;

    async fn make_transaction(&self, request: TransactionRequest) -> LedgerResult<TransactionReceipt>;

    async fn get_all_customers(&self, status: Option<CustomerStatus>) -> LedgerResult<Vec<Customer>>;
}

/// Stateless `AccountService` over any `AccountRepository`.
///
/// Holds no mutable state, so one instance is shared by all request tasks.
/// Serialization of balance updates is delegated to the repository's row lock.
#[derive(Debug, Clone)]
pub struct LedgerService<R> {
    repository: R,
    policy: LedgerPolicy,
}

impl<R: AccountRepository> LedgerService<R> {
    pub fn new(repository: R, policy: LedgerPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Run `work` under the call deadline. Contention that reaches this point
    /// was not retried and is reported as a store fault.
    async fn within_deadline<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = LedgerResult<T>>,
    ) -> LedgerResult<T> {
        match tokio::time::timeout(self.policy.deadline, work).await {
            Ok(Err(e)) if e.is_transient() => {
                warn!(operation, error = %e, "store contended");
                Err(LedgerError::unexpected(format!("{operation} failed: {e}")))
            }
            Ok(result) => result,
            Err(_) => {
                warn!(operation, deadline = ?self.policy.deadline, "deadline exceeded; unit of work abandoned");
                Err(LedgerError::unexpected(format!(
                    "{operation} exceeded its deadline of {:?}",
                    self.policy.deadline
                )))
            }
        }
    }

    async fn post_with_retry(&self, request: &TransactionRequest) -> LedgerResult<Transaction> {
        let mut attempt = 1;
        loop {
            let rule = |account: &Account| plan_posting(account, request, Utc::now());
            match self.repository.apply_transaction(request.account_id, &rule).await {
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    warn!(attempt, error = %e, "account contended; retrying from a fresh read");
                    tokio::time::sleep(self.policy.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    error!(attempt, error = %e, "account still contended; giving up");
                    return Err(LedgerError::unexpected(format!(
                        "gave up after {attempt} attempts: {e}"
                    )));
                }
                other => return other,
            }
        }
    }

    async fn ensure_customer(&self, customer_id: CustomerId) -> LedgerResult<()> {
        if self.repository.customer_exists(customer_id).await? {
            Ok(())
        } else {
            Err(LedgerError::customer_not_found())
        }
    }
}

#[async_trait]
impl<R: AccountRepository> AccountService for LedgerService<R> {
    #[tracing::instrument(skip(self), fields(customer_id = %request.customer_id))]
    async fn open_account(&self, request: OpenAccountRequest) -> LedgerResult<Account> {
        validate_opening(&self.policy, request.amount)?;

        let account = self
            .within_deadline("open_account", async {
                self.ensure_customer(request.customer_id).await?;
                self.repository
                    .save(NewAccount {
                        customer_id: request.customer_id,
                        account_type: request.account_type,
                        opening_balance: request.amount,
                        opened_at: Utc::now(),
                    })
                    .await
            })
            .await?;

        info!(account_id = %account.id, balance = %account.balance, "account opened");
        Ok(account)
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_accounts(&self, customer_id: CustomerId) -> LedgerResult<Vec<Account>> {
        self.within_deadline("get_all_accounts", async {
            self.ensure_customer(customer_id).await?;
            self.repository.find_all_by_customer(customer_id).await
        })
        .await
    }

    #[tracing::instrument(
        skip(self),
        fields(
            account_id = %request.account_id,
            transaction_type = %request.transaction_type
        )
    )]
    async fn make_transaction(&self, request: TransactionRequest) -> LedgerResult<TransactionReceipt> {
        let tx = self
            .within_deadline("make_transaction", self.post_with_retry(&request))
            .await?;

        debug!(transaction_id = %tx.id, balance = %tx.resulting_balance, "transaction committed");
        Ok(TransactionReceipt::from(&tx))
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_customers(&self, status: Option<CustomerStatus>) -> LedgerResult<Vec<Customer>> {
        self.within_deadline("get_all_customers", self.repository.find_customers(status))
            .await
    }
}

/// Opening rules, checked before the store is touched.
pub fn validate_opening(policy: &LedgerPolicy, amount: Money) -> LedgerResult<()> {
    if !amount.is_positive() {
        return Err(LedgerError::validation("amount must be positive"));
    }
    if amount < policy.minimum_opening_balance {
        return Err(LedgerError::validation(format!(
            "to open a new account, you need to deposit at least {}",
            policy.minimum_opening_balance
        )));
    }
    Ok(())
}

/// Decide the posting for `request` against the locked `account`.
///
/// Checks run in order: ownership, amount, resulting balance. Overdrafts
/// are never allowed.
pub fn plan_posting(
    account: &Account,
    request: &TransactionRequest,
    now: DateTime<Utc>,
) -> LedgerResult<Posting> {
    if !account.is_owned_by(request.customer_id) {
        return Err(LedgerError::unauthorized(format!(
            "account {} does not belong to customer {}",
            account.id, request.customer_id
        )));
    }
    if !request.amount.is_positive() {
        return Err(LedgerError::validation("amount must be positive"));
    }

    let resulting_balance = request
        .transaction_type
        .apply(account.balance, request.amount)?;

    if resulting_balance.is_negative() {
        return Err(LedgerError::InsufficientFunds {
            balance: account.balance,
            requested: request.amount,
        });
    }

    Ok(Posting {
        transaction_type: request.transaction_type,
        amount: request.amount,
        prior_balance: account.balance,
        resulting_balance,
        occurred_at: now,
    })
}
