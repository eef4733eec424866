//! Persistence boundary for accounts and their ledger entries.

use std::sync::Arc;

use async_trait::async_trait;

use bankline_core::{AccountId, CustomerId, LedgerResult};

use crate::account::{Account, NewAccount};
use crate::customer::{Customer, CustomerStatus};
use crate::transaction::{Posting, Transaction};

/// Decision evaluated against the locked account inside the unit of work.
///
/// Returning an error aborts the unit of work; nothing is written.
pub type PostingRule<'a> = dyn Fn(&Account) -> LedgerResult<Posting> + Send + Sync + 'a;

/// Account persistence with an atomic unit of work for balance mutation.
///
/// ## Error translation
///
/// Implementations never leak driver errors. Store failures are mapped onto
/// `LedgerError`:
///
/// - missing rows become `NotFound`
/// - lock wait timeouts, deadlocks and pool exhaustion become `Contention`
/// - everything else becomes `Unexpected`
///
/// ## Concurrency
///
/// `apply_transaction` must hold an exclusive lock on the account from the
/// moment the balance is read until the new balance is committed, so two
/// concurrent transactions on the same account can never both observe the
/// same prior balance. Transactions on different accounts must not contend.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Whether the customer subsystem knows this customer.
    async fn customer_exists(&self, customer_id: CustomerId) -> LedgerResult<bool>;

    /// Customers ordered by id, optionally restricted to one status.
    async fn find_customers(&self, status: Option<CustomerStatus>) -> LedgerResult<Vec<Customer>>;

    /// Insert the account and its opening deposit in one unit of work.
    async fn save(&self, account: NewAccount) -> LedgerResult<Account>;

    async fn find_by_id(&self, account_id: AccountId) -> LedgerResult<Account>;

    /// All accounts of a customer ordered by open date (ties by id).
    async fn find_all_by_customer(&self, customer_id: CustomerId) -> LedgerResult<Vec<Account>>;

    /// Lock the account, let `rule` decide the posting, then append the
    /// transaction and update the balance atomically.
    async fn apply_transaction(
        &self,
        account_id: AccountId,
        rule: &PostingRule<'_>,
    ) -> LedgerResult<Transaction>;
}

#[async_trait]
impl<R> AccountRepository for Arc<R>
where
    R: AccountRepository + ?Sized,
{
    async fn customer_exists(&self, customer_id: CustomerId) -> LedgerResult<bool> {
        (**self).customer_exists(customer_id).await
    }

    async fn find_customers(&self, status: Option<CustomerStatus>) -> LedgerResult<Vec<Customer>> {
        (**self).find_customers(status).await
    }

    async fn save(&self, account: NewAccount) -> LedgerResult<Account> {
        (**self).save(account).await
    }

    async fn find_by_id(&self, account_id: AccountId) -> LedgerResult<Account> {
        (**self).find_by_id(account_id).await
    }

    async fn find_all_by_customer(&self, customer_id: CustomerId) -> LedgerResult<Vec<Account>> {
        (**self).find_all_by_customer(customer_id).await
    }

    async fn apply_transaction(
        &self,
        account_id: AccountId,
        rule: &PostingRule<'_>,
    ) -> LedgerResult<Transaction> {
        (**self).apply_transaction(account_id, rule).await
    }
}
