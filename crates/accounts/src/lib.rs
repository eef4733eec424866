//! Account ledger module.
//!
//! Domain types, the repository boundary and the ledger service. No HTTP and
//! no SQL here; concrete stores live in `bankline-infra`.

pub mod account;
pub mod customer;
pub mod repository;
pub mod service;
pub mod transaction;

pub use account::{Account, AccountType, NewAccount};
pub use customer::{Customer, CustomerStatus};
pub use repository::{AccountRepository, PostingRule};
pub use service::{
    AccountService, LedgerPolicy, LedgerService, OpenAccountRequest, TransactionRequest, plan_posting,
    validate_opening,
};
pub use transaction::{Posting, Transaction, TransactionReceipt, TransactionType};
