//! Postgres-backed account repository.
//!
//! ## Concurrency
//!
//! `apply_transaction` takes a row lock (`SELECT ... FOR UPDATE`) on the
//! account before reading its balance and keeps it until commit. Concurrent
//! transactions on the same account queue on that lock; other accounts are
//! unaffected. The wait is bounded by a transaction-local `lock_timeout`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError |
//! |------------|----------------------|-------------|
//! | Database (lock not available) | `55P03` | `Contention` |
//! | Database (serialization failure) | `40001` | `Contention` |
//! | Database (deadlock detected) | `40P01` | `Contention` |
//! | Database (foreign key violation) on account insert | `23503` | `NotFound("customer")` |
//! | Database (other) | Any other | `Unexpected` |
//! | PoolTimedOut | N/A | `Contention` |
//! | Other | N/A | `Unexpected` |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::{debug, instrument};

use bankline_accounts::{
    Account, AccountRepository, AccountType, Customer, CustomerStatus, NewAccount, Posting, PostingRule,
    Transaction,
};
use bankline_core::{AccountId, CustomerId, LedgerError, LedgerResult, Money, TransactionId};

#[derive(Debug, Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Register a customer.
    ///
    /// Customers belong to the customer subsystem; this exists for seeding
    /// development databases and for tests.
    #[instrument(skip(self), err)]
    pub async fn insert_customer(&self, name: &str, status: CustomerStatus) -> LedgerResult<CustomerId> {
        let row = sqlx::query("INSERT INTO customers (name, status) VALUES ($1, $2) RETURNING customer_id")
            .bind(name)
            .bind(status.code())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_customer", e))?;

        let id: i64 = row
            .try_get("customer_id")
            .map_err(|e| map_sqlx_error("insert_customer", e))?;
        Ok(CustomerId::new(id))
    }

    /// Ledger entries of an account in commit order.
    #[instrument(skip(self), fields(account_id = %account_id), err)]
    pub async fn transactions_of(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, account_id, transaction_type, amount_minor,
                   resulting_balance_minor, transaction_date
            FROM transactions
            WHERE account_id = $1
            ORDER BY transaction_id ASC
            "#,
        )
        .bind(account_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions_of", e))?;

        rows.iter()
            .map(|row| {
                TransactionRow::from_row(row)
                    .map_err(|e| map_sqlx_error("transactions_of", e))
                    .and_then(Transaction::try_from)
            })
            .collect()
    }

    fn lock_timeout_setting(&self) -> String {
        format!("{}ms", self.lock_timeout.as_millis())
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    #[instrument(skip(self), fields(customer_id = %customer_id), err)]
    async fn customer_exists(&self, customer_id: CustomerId) -> LedgerResult<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM customers WHERE customer_id = $1) AS present")
            .bind(customer_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("customer_exists", e))?;

        row.try_get("present")
            .map_err(|e| map_sqlx_error("customer_exists", e))
    }

    #[instrument(skip(self), err)]
    async fn find_customers(&self, status: Option<CustomerStatus>) -> LedgerResult<Vec<Customer>> {
        let rows = sqlx::query(
            r#"
            SELECT customer_id, name, city, zipcode, date_of_birth, status
            FROM customers
            WHERE $1::SMALLINT IS NULL OR status = $1
            ORDER BY customer_id ASC
            "#,
        )
        .bind(status.map(CustomerStatus::code))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_customers", e))?;

        rows.iter()
            .map(|row| {
                CustomerRow::from_row(row)
                    .map_err(|e| map_sqlx_error("find_customers", e))
                    .and_then(Customer::try_from)
            })
            .collect()
    }

    #[instrument(skip(self, account), fields(customer_id = %account.customer_id), err)]
    async fn save(&self, account: NewAccount) -> LedgerResult<Account> {
        // Postgres keeps microseconds; truncate so the returned value matches later reads.
        let account = NewAccount {
            opened_at: account.opened_at.trunc_subsecs(6),
            ..account
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("save", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO accounts (customer_id, opening_date, account_type, balance_minor)
            VALUES ($1, $2, $3, $4)
            RETURNING account_id
            "#,
        )
        .bind(account.customer_id.get())
        .bind(account.opened_at)
        .bind(account.account_type.as_str())
        .bind(account.opening_balance.cents())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                LedgerError::customer_not_found()
            } else {
                map_sqlx_error("save", e)
            }
        })?;

        let account_id = AccountId::new(
            row.try_get("account_id")
                .map_err(|e| map_sqlx_error("save", e))?,
        );

        let opening = Posting::opening_deposit(account.opening_balance, account.opened_at);
        insert_transaction(&mut tx, account_id, &opening).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("save", e))?;

        debug!(account_id = %account_id, "account row and opening deposit committed");
        Ok(account.into_account(account_id))
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn find_by_id(&self, account_id: AccountId) -> LedgerResult<Account> {
        let row = sqlx::query(
            r#"
            SELECT account_id, customer_id, account_type, balance_minor, opening_date
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?
        .ok_or_else(LedgerError::account_not_found)?;

        AccountRow::from_row(&row)
            .map_err(|e| map_sqlx_error("find_by_id", e))?
            .try_into()
    }

    #[instrument(skip(self), fields(customer_id = %customer_id), err)]
    async fn find_all_by_customer(&self, customer_id: CustomerId) -> LedgerResult<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT account_id, customer_id, account_type, balance_minor, opening_date
            FROM accounts
            WHERE customer_id = $1
            ORDER BY opening_date ASC, account_id ASC
            "#,
        )
        .bind(customer_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_all_by_customer", e))?;

        rows.iter()
            .map(|row| {
                AccountRow::from_row(row)
                    .map_err(|e| map_sqlx_error("find_all_by_customer", e))
                    .and_then(Account::try_from)
            })
            .collect()
    }

    #[instrument(skip(self, rule), fields(account_id = %account_id), err(level = "warn"))]
    async fn apply_transaction(
        &self,
        account_id: AccountId,
        rule: &PostingRule<'_>,
    ) -> LedgerResult<Transaction> {
        // Every early return below drops `tx`, which rolls it back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("apply_transaction", e))?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(self.lock_timeout_setting())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply_transaction", e))?;

        let row = sqlx::query(
            r#"
            SELECT account_id, customer_id, account_type, balance_minor, opening_date
            FROM accounts
            WHERE account_id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("apply_transaction", e))?
        .ok_or_else(LedgerError::account_not_found)?;

        let account: Account = AccountRow::from_row(&row)
            .map_err(|e| map_sqlx_error("apply_transaction", e))?
            .try_into()?;

        let posting = rule(&account)?;
        if posting.prior_balance != account.balance {
            return Err(LedgerError::unexpected(format!(
                "posting computed against balance {}, locked row holds {}",
                posting.prior_balance, account.balance
            )));
        }

        let transaction = insert_transaction(&mut tx, account_id, &posting).await?;

        sqlx::query("UPDATE accounts SET balance_minor = $1 WHERE account_id = $2")
            .bind(posting.resulting_balance.cents())
            .bind(account_id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply_transaction", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("apply_transaction", e))?;

        Ok(transaction)
    }
}

async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    account_id: AccountId,
    posting: &Posting,
) -> LedgerResult<Transaction> {
    let posting = Posting {
        occurred_at: posting.occurred_at.trunc_subsecs(6),
        ..posting.clone()
    };

    let row = sqlx::query(
        r#"
        INSERT INTO transactions
            (account_id, transaction_type, amount_minor, resulting_balance_minor, transaction_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING transaction_id
        "#,
    )
    .bind(account_id.get())
    .bind(posting.transaction_type.as_str())
    .bind(posting.amount.cents())
    .bind(posting.resulting_balance.cents())
    .bind(posting.occurred_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_transaction", e))?;

    let id: i64 = row
        .try_get("transaction_id")
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;

    Ok(posting.into_transaction(TransactionId::new(id), account_id))
}

/// Map SQLx errors onto the ledger taxonomy.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                // lock_not_available, serialization_failure, deadlock_detected
                Some("55P03") | Some("40001") | Some("40P01") => LedgerError::contention(msg),
                _ => LedgerError::unexpected(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            LedgerError::contention(format!("timed out waiting for a connection in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            LedgerError::unexpected(format!("connection pool closed in {}", operation))
        }
        _ => LedgerError::unexpected(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23503";
        }
    }
    false
}

// SQLx row types

#[derive(Debug)]
struct CustomerRow {
    customer_id: i64,
    name: String,
    city: Option<String>,
    zipcode: Option<String>,
    date_of_birth: Option<NaiveDate>,
    status: i16,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CustomerRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(CustomerRow {
            customer_id: row.try_get("customer_id")?,
            name: row.try_get("name")?,
            city: row.try_get("city")?,
            zipcode: row.try_get("zipcode")?,
            date_of_birth: row.try_get("date_of_birth")?,
            status: row.try_get("status")?,
        })
    }
}

impl TryFrom<CustomerRow> for Customer {
    type Error = LedgerError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer {
            id: CustomerId::new(row.customer_id),
            name: row.name,
            city: row.city,
            zipcode: row.zipcode,
            date_of_birth: row.date_of_birth,
            status: CustomerStatus::from_code(row.status)?,
        })
    }
}

#[derive(Debug)]
struct AccountRow {
    account_id: i64,
    customer_id: i64,
    account_type: String,
    balance_minor: i64,
    opening_date: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AccountRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            account_id: row.try_get("account_id")?,
            customer_id: row.try_get("customer_id")?,
            account_type: row.try_get("account_type")?,
            balance_minor: row.try_get("balance_minor")?,
            opening_date: row.try_get("opening_date")?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = LedgerError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let account_type: AccountType = row
            .account_type
            .parse()
            .map_err(|e| LedgerError::unexpected(format!("corrupt account row {}: {e}", row.account_id)))?;

        Ok(Account {
            id: AccountId::new(row.account_id),
            customer_id: CustomerId::new(row.customer_id),
            account_type,
            balance: Money::from_cents(row.balance_minor),
            opened_at: row.opening_date,
        })
    }
}

#[derive(Debug)]
struct TransactionRow {
    transaction_id: i64,
    account_id: i64,
    transaction_type: String,
    amount_minor: i64,
    resulting_balance_minor: i64,
    transaction_date: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for TransactionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            transaction_id: row.try_get("transaction_id")?,
            account_id: row.try_get("account_id")?,
            transaction_type: row.try_get("transaction_type")?,
            amount_minor: row.try_get("amount_minor")?,
            resulting_balance_minor: row.try_get("resulting_balance_minor")?,
            transaction_date: row.try_get("transaction_date")?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = row.transaction_type.parse().map_err(|e| {
            LedgerError::unexpected(format!("corrupt transaction row {}: {e}", row.transaction_id))
        })?;

        Ok(Transaction {
            id: TransactionId::new(row.transaction_id),
            account_id: AccountId::new(row.account_id),
            transaction_type,
            amount: Money::from_cents(row.amount_minor),
            resulting_balance: Money::from_cents(row.resulting_balance_minor),
            timestamp: row.transaction_date,
        })
    }
}
