//! Customers as the ledger reads them.
//!
//! Customer records are owned by the customer subsystem; the ledger only
//! checks existence and lists them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bankline_core::{CustomerId, LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Inactive,
}

impl CustomerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
        }
    }

    /// Stored representation: `1` active, `0` inactive.
    pub fn code(self) -> i16 {
        match self {
            CustomerStatus::Active => 1,
            CustomerStatus::Inactive => 0,
        }
    }

    pub fn from_code(code: i16) -> LedgerResult<Self> {
        match code {
            1 => Ok(CustomerStatus::Active),
            0 => Ok(CustomerStatus::Inactive),
            other => Err(LedgerError::unexpected(format!("unknown customer status code {other}"))),
        }
    }
}

impl core::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for CustomerStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(CustomerStatus::Active),
            "inactive" => Ok(CustomerStatus::Inactive),
            other => Err(LedgerError::validation(format!(
                "status must be one of: active, inactive (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: CustomerStatus,
}

impl Customer {
    /// An active customer with no contact details.
    pub fn new(id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            city: None,
            zipcode: None,
            date_of_birth: None,
            status: CustomerStatus::Active,
        }
    }

    pub fn with_status(self, status: CustomerStatus) -> Self {
        Self { status, ..self }
    }

    /// `None` matches every customer.
    pub fn has_status(&self, status: Option<CustomerStatus>) -> bool {
        status.is_none_or(|s| s == self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_query_values() {
        assert_eq!("active".parse::<CustomerStatus>().unwrap(), CustomerStatus::Active);
        assert_eq!("Inactive".parse::<CustomerStatus>().unwrap(), CustomerStatus::Inactive);

        let err = "dormant".parse::<CustomerStatus>().unwrap_err();
        assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("active, inactive")));
    }

    #[test]
    fn status_codes_round_trip_and_reject_unknown() {
        for status in [CustomerStatus::Active, CustomerStatus::Inactive] {
            assert_eq!(CustomerStatus::from_code(status.code()).unwrap(), status);
        }
        assert!(matches!(CustomerStatus::from_code(7), Err(LedgerError::Unexpected(_))));
    }

    #[test]
    fn status_filter() {
        let customer = Customer::new(CustomerId::new(2), "Ashish").with_status(CustomerStatus::Inactive);

        assert!(customer.has_status(None));
        assert!(customer.has_status(Some(CustomerStatus::Inactive)));
        assert!(!customer.has_status(Some(CustomerStatus::Active)));
    }
}
