use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use bankline_accounts::{Account, AccountType, Customer, CustomerStatus, TransactionReceipt, TransactionType};
use bankline_core::{LedgerError, LedgerResult, Money};

/// Layout of `opening_date` in responses.
pub const OPENING_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of `date_of_birth` in responses.
pub const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

// -------------------------
// Request DTOs
// -------------------------

/// Fields are optional so that missing fields read as a validation error
/// naming them, not as a decoding failure.
///
/// Amounts stay as JSON number text until converted; they never pass
/// through a float.
#[derive(Debug, Deserialize)]
pub struct NewAccountRequest {
    pub account_type: Option<String>,
    pub amount: Option<Number>,
}

#[derive(Debug, Deserialize)]
pub struct NewTransactionRequest {
    pub transaction_type: Option<String>,
    pub amount: Option<Number>,
}

/// `GET /customers?status=...`; an empty value means every customer.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub status: Option<String>,
}

impl CustomerQuery {
    pub fn status(&self) -> LedgerResult<Option<CustomerStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

impl NewAccountRequest {
    pub fn validate(self) -> LedgerResult<(AccountType, Money)> {
        match (self.account_type, self.amount) {
            (Some(account_type), Some(amount)) => Ok((account_type.parse()?, exact_money(&amount)?)),
            (account_type, amount) => Err(missing_fields(&[
                ("account_type", account_type.is_none()),
                ("amount", amount.is_none()),
            ])),
        }
    }
}

impl NewTransactionRequest {
    pub fn validate(self) -> LedgerResult<(TransactionType, Money)> {
        match (self.transaction_type, self.amount) {
            (Some(transaction_type), Some(amount)) => Ok((transaction_type.parse()?, exact_money(&amount)?)),
            (transaction_type, amount) => Err(missing_fields(&[
                ("transaction_type", transaction_type.is_none()),
                ("amount", amount.is_none()),
            ])),
        }
    }
}

/// One error listing every absent field, in declaration order.
fn missing_fields(fields: &[(&str, bool)]) -> LedgerError {
    let names = fields
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();
    LedgerError::validation(format!("missing or null fields: {}", names.join(", ")))
}

/// Convert the number as written. Digits that do not fit a `Decimal` are
/// refused rather than rounded.
fn exact_money(amount: &Number) -> LedgerResult<Money> {
    let text = amount.to_string();
    let decimal = Decimal::from_str_exact(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| LedgerError::validation(format!("amount {text} cannot be represented exactly")))?;
    Money::from_decimal(decimal)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct NewAccountResponse {
    pub account_id: String,
}

#[derive(Debug, Serialize)]
pub struct NewTransactionResponse {
    pub transaction_id: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct AccountListItem {
    pub account_id: String,
    pub opening_date: String,
    pub account_type: AccountType,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub customer_id: String,
    pub full_name: String,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub date_of_birth: Option<String>,
    pub status: CustomerStatus,
}

pub fn account_to_list_item(account: &Account) -> AccountListItem {
    AccountListItem {
        account_id: account.id.to_string(),
        opening_date: account.opened_at.format(OPENING_DATE_FORMAT).to_string(),
        account_type: account.account_type,
        amount: account.balance.to_decimal(),
    }
}

pub fn customer_to_response(customer: &Customer) -> CustomerResponse {
    CustomerResponse {
        customer_id: customer.id.to_string(),
        full_name: customer.name.clone(),
        city: customer.city.clone(),
        zipcode: customer.zipcode.clone(),
        date_of_birth: customer.date_of_birth.map(|d| d.format(BIRTH_DATE_FORMAT).to_string()),
        status: customer.status,
    }
}

pub fn receipt_to_response(receipt: TransactionReceipt) -> NewTransactionResponse {
    NewTransactionResponse {
        transaction_id: receipt.transaction_id.to_string(),
        balance: receipt.balance.to_decimal(),
    }
}
