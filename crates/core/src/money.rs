//! Exact monetary amounts.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// A monetary amount held as a signed count of cents.
///
/// All balance arithmetic goes through the checked operations below; there is
/// no floating-point representation anywhere in the ledger. Amounts entering
/// from the outside world are converted with [`Money::from_decimal`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Number of fractional digits (cents).
    pub const SCALE: u32 = 2;

    /// Minor units per major unit.
    pub const CENTS_PER_UNIT: i64 = 100;

    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Whole currency units, e.g. `from_units(6000)` is `6000.00`.
    pub fn from_units(units: i64) -> LedgerResult<Self> {
        units
            .checked_mul(Self::CENTS_PER_UNIT)
            .map(Self)
            .ok_or_else(|| LedgerError::validation(format!("amount {units} is out of range")))
    }

    /// Convert an exact decimal into cents.
    ///
    /// Fails when the value carries more than two fractional digits or does
    /// not fit the representable range.
    pub fn from_decimal(amount: Decimal) -> LedgerResult<Self> {
        if amount.normalize().scale() > Self::SCALE {
            return Err(LedgerError::validation(format!(
                "amount {amount} has more than {} decimal places",
                Self::SCALE
            )));
        }

        amount
            .checked_mul(Decimal::from(Self::CENTS_PER_UNIT))
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or_else(|| LedgerError::validation(format!("amount {amount} is out of range")))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, Self::SCALE)
    }

    pub fn checked_add(self, rhs: Money) -> LedgerResult<Money> {
        self.0
            .checked_add(rhs.0)
            .map(Money)
            .ok_or_else(|| LedgerError::validation(format!("{self} + {rhs} overflows")))
    }

    pub fn checked_sub(self, rhs: Money) -> LedgerResult<Money> {
        self.0
            .checked_sub(rhs.0)
            .map(Money)
            .ok_or_else(|| LedgerError::validation(format!("{self} - {rhs} overflows")))
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.to_decimal(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn converts_decimals_with_up_to_two_places() {
        assert_eq!(Money::from_decimal(dec("6000")).unwrap(), Money::from_cents(600_000));
        assert_eq!(Money::from_decimal(dec("10.5")).unwrap(), Money::from_cents(1_050));
        assert_eq!(Money::from_decimal(dec("0.01")).unwrap(), Money::from_cents(1));
        // Trailing zeros beyond the scale are harmless.
        assert_eq!(Money::from_decimal(dec("1.2300")).unwrap(), Money::from_cents(123));
    }

    #[test]
    fn rejects_sub_cent_precision() {
        let err = Money::from_decimal(dec("0.001")).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("decimal places")));
    }

    #[test]
    fn rejects_values_beyond_i64_cents() {
        let err = Money::from_decimal(dec("92233720368547758.08")).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(msg) if msg.contains("out of range")));
        assert!(Money::from_units(i64::MAX).is_err());
    }

    #[test]
    fn overflow_is_a_validation_error_not_a_wrap() {
        let max = Money::from_cents(i64::MAX);
        assert!(matches!(max.checked_add(Money::from_cents(1)), Err(LedgerError::Validation(_))));
        let min = Money::from_cents(i64::MIN);
        assert!(matches!(min.checked_sub(Money::from_cents(1)), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn displays_with_two_decimals() {
        assert_eq!(Money::from_units(6000).unwrap().to_string(), "6000.00");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
    }

    #[test]
    fn serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(1234)).unwrap();
        assert_eq!(json, "1234");
    }

    proptest! {
        #[test]
        fn addition_is_commutative(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
            let (a, b) = (Money::from_cents(a), Money::from_cents(b));
            prop_assert_eq!(a.checked_add(b).unwrap(), b.checked_add(a).unwrap());
        }

        #[test]
        fn subtraction_undoes_addition(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
            let (a, b) = (Money::from_cents(a), Money::from_cents(b));
            prop_assert_eq!(a.checked_add(b).unwrap().checked_sub(b).unwrap(), a);
        }

        #[test]
        fn decimal_conversion_is_exact(cents in any::<i64>()) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(Money::from_decimal(money.to_decimal()).unwrap(), money);
        }
    }
}
