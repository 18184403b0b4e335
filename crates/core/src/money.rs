//! Monetary amounts with 2-place decimal precision.

use core::iter::Sum;
use core::ops::{Add, Sub};
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Monetary amount, always held at 2 decimal places.
///
/// Rounding happens once, on construction (midpoint away from zero). Sums and
/// differences of 2-place values stay at 2 places.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Amount given in minor units (cents).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `self * quantity`, e.g. unit price times line quantity.
    ///
    /// Amounts beyond what `Decimal` can hold are `InvalidArgument`.
    pub fn times(&self, quantity: i64) -> DomainResult<Self> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self::new)
            .ok_or_else(|| out_of_range(format_args!("{self} x {quantity}")))
    }

    pub fn checked_add(self, rhs: Money) -> DomainResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Money)
            .ok_or_else(|| out_of_range(format_args!("{self} + {rhs}")))
    }
}

fn out_of_range(expr: core::fmt::Arguments<'_>) -> DomainError {
    DomainError::invalid_argument(format!("amount out of range: {expr}"))
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::invalid_argument(format!("invalid amount '{s}': {e}")))?;
        Ok(Money::new(amount))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
