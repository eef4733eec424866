use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use bankline_accounts::{
    Account, AccountRepository, Customer, CustomerStatus, NewAccount, Posting, PostingRule, Transaction,
};
use bankline_core::{AccountId, CustomerId, LedgerError, LedgerResult, TransactionId};

type AccountSlot = Arc<AsyncMutex<Account>>;

/// An account and its owner. The owner never changes, so it can be read
/// without taking the slot lock.
#[derive(Debug, Clone)]
struct AccountEntry {
    owner: CustomerId,
    slot: AccountSlot,
}

/// In-memory account repository.
///
/// Intended for tests/dev. Each account sits behind its own async mutex, which
/// plays the role of the row lock: `apply_transaction` holds it from the
/// balance read to the balance write. Every wait for a slot is bounded by
/// `lock_timeout`.
#[derive(Debug)]
pub struct InMemoryAccountRepository {
    customers: RwLock<BTreeMap<CustomerId, Customer>>,
    accounts: RwLock<BTreeMap<AccountId, AccountEntry>>,
    transactions: Mutex<Vec<Transaction>>,
    next_account_id: AtomicI64,
    next_transaction_id: AtomicI64,
    lock_timeout: Duration,
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountRepository {
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new() -> Self {
        Self {
            customers: RwLock::new(BTreeMap::new()),
            accounts: RwLock::new(BTreeMap::new()),
            transactions: Mutex::new(Vec::new()),
            next_account_id: AtomicI64::new(1),
            next_transaction_id: AtomicI64::new(1),
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Seed active customers named after their id.
    pub fn with_customers(customers: impl IntoIterator<Item = CustomerId>) -> Self {
        let customers = customers
            .into_iter()
            .map(|id| (id, Customer::new(id, format!("customer {id}"))))
            .collect();
        Self {
            customers: RwLock::new(customers),
            ..Self::new()
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Start account ids at `first`, e.g. to reproduce fixed ids in tests.
    pub fn with_first_account_id(self, first: i64) -> Self {
        self.next_account_id.store(first, Ordering::SeqCst);
        self
    }

    /// Insert or replace a customer record.
    pub fn add_customer(&self, customer: Customer) -> LedgerResult<()> {
        self.customers
            .write()
            .map_err(|_| poisoned())?
            .insert(customer.id, customer);
        Ok(())
    }

    /// Ledger entries of one account in commit order.
    pub fn transactions_of(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.transactions.lock().map_err(|_| poisoned())?;
        Ok(transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }

    fn slot(&self, account_id: AccountId) -> LedgerResult<AccountSlot> {
        self.accounts
            .read()
            .map_err(|_| poisoned())?
            .get(&account_id)
            .map(|entry| Arc::clone(&entry.slot))
            .ok_or_else(LedgerError::account_not_found)
    }

    async fn lock_slot<'a>(
        &self,
        account_id: AccountId,
        slot: &'a AccountSlot,
    ) -> LedgerResult<tokio::sync::MutexGuard<'a, Account>> {
        tokio::time::timeout(self.lock_timeout, slot.lock())
            .await
            .map_err(|_| {
                LedgerError::contention(format!(
                    "lock wait on account {account_id} exceeded {:?}",
                    self.lock_timeout
                ))
            })
    }

    fn next_transaction_id(&self) -> TransactionId {
        TransactionId::new(self.next_transaction_id.fetch_add(1, Ordering::SeqCst))
    }

    fn record(&self, transaction: Transaction) -> LedgerResult<()> {
        self.transactions
            .lock()
            .map_err(|_| poisoned())?
            .push(transaction);
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn customer_exists(&self, customer_id: CustomerId) -> LedgerResult<bool> {
        Ok(self
            .customers
            .read()
            .map_err(|_| poisoned())?
            .contains_key(&customer_id))
    }

    async fn find_customers(&self, status: Option<CustomerStatus>) -> LedgerResult<Vec<Customer>> {
        Ok(self
            .customers
            .read()
            .map_err(|_| poisoned())?
            .values()
            .filter(|c| c.has_status(status))
            .cloned()
            .collect())
    }

    async fn save(&self, account: NewAccount) -> LedgerResult<Account> {
        // Same guarantee the foreign key gives in Postgres.
        if !self.customer_exists(account.customer_id).await? {
            return Err(LedgerError::customer_not_found());
        }

        let id = AccountId::new(self.next_account_id.fetch_add(1, Ordering::SeqCst));
        let opening = Posting::opening_deposit(account.opening_balance, account.opened_at);
        let account = account.into_account(id);

        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        self.record(opening.into_transaction(self.next_transaction_id(), id))?;
        accounts.insert(
            id,
            AccountEntry {
                owner: account.customer_id,
                slot: Arc::new(AsyncMutex::new(account.clone())),
            },
        );

        Ok(account)
    }

    async fn find_by_id(&self, account_id: AccountId) -> LedgerResult<Account> {
        let slot = self.slot(account_id)?;
        let account = self.lock_slot(account_id, &slot).await?;
        Ok(account.clone())
    }

    async fn find_all_by_customer(&self, customer_id: CustomerId) -> LedgerResult<Vec<Account>> {
        let slots: Vec<(AccountId, AccountSlot)> = self
            .accounts
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .filter(|(_, entry)| entry.owner == customer_id)
            .map(|(id, entry)| (*id, Arc::clone(&entry.slot)))
            .collect();

        let mut owned = Vec::with_capacity(slots.len());
        for (account_id, slot) in &slots {
            owned.push(self.lock_slot(*account_id, slot).await?.clone());
        }
        owned.sort_by_key(|a| (a.opened_at, a.id));
        Ok(owned)
    }

    async fn apply_transaction(
        &self,
        account_id: AccountId,
        rule: &PostingRule<'_>,
    ) -> LedgerResult<Transaction> {
        let slot = self.slot(account_id)?;
        let mut account = self.lock_slot(account_id, &slot).await?;

        let posting = rule(&*account)?;
        if posting.prior_balance != account.balance {
            return Err(LedgerError::unexpected(format!(
                "posting computed against balance {}, locked account holds {}",
                posting.prior_balance, account.balance
            )));
        }
        if posting.resulting_balance.is_negative() {
            return Err(LedgerError::unexpected(format!(
                "balance of account {account_id} would become {}",
                posting.resulting_balance
            )));
        }

        let transaction = posting
            .clone()
            .into_transaction(self.next_transaction_id(), account_id);
        self.record(transaction.clone())?;
        account.balance = posting.resulting_balance;

        Ok(transaction)
    }
}

fn poisoned() -> LedgerError {
    LedgerError::unexpected("lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankline_accounts::{AccountType, TransactionType};
    use bankline_core::Money;
    use chrono::Utc;

    fn new_account(customer: i64, cents: i64) -> NewAccount {
        NewAccount {
            customer_id: CustomerId::new(customer),
            account_type: AccountType::Saving,
            opening_balance: Money::from_cents(cents),
            opened_at: Utc::now(),
        }
    }

    fn deposit_of(cents: i64) -> impl Fn(&Account) -> LedgerResult<Posting> + Send + Sync {
        move |account: &Account| {
            let amount = Money::from_cents(cents);
            Ok(Posting {
                transaction_type: TransactionType::Deposit,
                amount,
                prior_balance: account.balance,
                resulting_balance: account.balance.checked_add(amount)?,
                occurred_at: Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn save_requires_a_known_customer() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(2)]);

        let err = repo.save(new_account(3, 600_000)).await.unwrap_err();
        assert_eq!(err, LedgerError::customer_not_found());

        let account = repo.save(new_account(2, 600_000)).await.unwrap();
        assert_eq!(repo.find_by_id(account.id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn save_writes_the_opening_deposit() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(2)]);
        let account = repo.save(new_account(2, 600_000)).await.unwrap();

        let history = repo.transactions_of(account.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_type, TransactionType::Deposit);
        assert_eq!(history[0].amount, account.balance);
    }

    #[tokio::test]
    async fn fixed_first_account_id() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(2)]).with_first_account_id(1977);
        let account = repo.save(new_account(2, 600_000)).await.unwrap();
        assert_eq!(account.id, AccountId::new(1977));
    }

    #[tokio::test]
    async fn rejected_posting_leaves_no_trace() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(2)]);
        let account = repo.save(new_account(2, 100)).await.unwrap();

        let refuse = |_: &Account| -> LedgerResult<Posting> { Err(LedgerError::validation("no")) };
        let err = repo.apply_transaction(account.id, &refuse).await.unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(repo.find_by_id(account.id).await.unwrap().balance, Money::from_cents(100));
        assert_eq!(repo.transactions_of(account.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_prior_balance_is_refused() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(2)]);
        let account = repo.save(new_account(2, 100)).await.unwrap();

        let stale = |_: &Account| -> LedgerResult<Posting> {
            Ok(Posting {
                transaction_type: TransactionType::Deposit,
                amount: Money::from_cents(1),
                prior_balance: Money::from_cents(50),
                resulting_balance: Money::from_cents(51),
                occurred_at: Utc::now(),
            })
        };
        let err = repo.apply_transaction(account.id, &stale).await.unwrap_err();

        assert!(matches!(err, LedgerError::Unexpected(_)));
        assert_eq!(repo.find_by_id(account.id).await.unwrap().balance, Money::from_cents(100));
    }

    #[tokio::test]
    async fn lock_wait_is_bounded() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(2)])
            .with_lock_timeout(Duration::from_millis(10));
        let account = repo.save(new_account(2, 100)).await.unwrap();

        let slot = repo.slot(account.id).unwrap();
        let _held = slot.lock().await;

        let err = repo
            .apply_transaction(account.id, &deposit_of(1))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn listing_ignores_other_customers_locked_accounts() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(2), CustomerId::new(3)])
            .with_lock_timeout(Duration::from_millis(10));
        let mine = repo.save(new_account(2, 600_000)).await.unwrap();
        let theirs = repo.save(new_account(3, 600_000)).await.unwrap();

        let slot = repo.slot(theirs.id).unwrap();
        let _held = slot.lock().await;

        let accounts = repo.find_all_by_customer(CustomerId::new(2)).await.unwrap();
        assert_eq!(accounts, vec![mine]);

        let err = repo.find_all_by_customer(CustomerId::new(3)).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn customers_listed_by_id_with_status_filter() {
        let repo = InMemoryAccountRepository::with_customers([CustomerId::new(3), CustomerId::new(2)]);
        repo.add_customer(Customer::new(CustomerId::new(5), "Rob").with_status(CustomerStatus::Inactive))
            .unwrap();

        let all = repo.find_customers(None).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 5]);

        let inactive = repo.find_customers(Some(CustomerStatus::Inactive)).await.unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].name, "Rob");
        assert!(repo.customer_exists(CustomerId::new(5)).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let repo = InMemoryAccountRepository::new();
        let err = repo
            .apply_transaction(AccountId::new(9), &deposit_of(1))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::account_not_found());
    }
}
