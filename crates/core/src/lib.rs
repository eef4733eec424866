//! `bankline-core`: ledger foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! exact money arithmetic, strongly-typed identifiers and the error taxonomy
//! shared by every layer of the ledger.

pub mod error;
pub mod id;
pub mod money;

pub use error::{LedgerError, LedgerResult};
pub use id::{AccountId, CustomerId, TransactionId};
pub use money::Money;
