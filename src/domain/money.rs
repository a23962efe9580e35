//! Currency codes and currency-tagged decimal amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use super::error::FolioError;

/// ISO-4217 style currency code: exactly three ASCII uppercase letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub const USD: Currency = Currency(*b"USD");

    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for Currency {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(FolioError::invalid(
                "currency",
                format!("{s:?} is not a three-letter uppercase code"),
            ));
        }
        Ok(Currency([bytes[0], bytes[1], bytes[2]]))
    }
}

impl TryFrom<String> for Currency {
    type Error = FolioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exact decimal amount in a single currency.
///
/// Arithmetic between two `Money` values of different currencies is a
/// programming error: the operator impls panic, `checked_add`/`checked_sub`
/// return an error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Money { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Money {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn checked_add(self, rhs: Money) -> Result<Money, FolioError> {
        self.same_currency(&rhs)?;
        Ok(Money::new(self.amount + rhs.amount, self.currency))
    }

    pub fn checked_sub(self, rhs: Money) -> Result<Money, FolioError> {
        self.same_currency(&rhs)?;
        Ok(Money::new(self.amount - rhs.amount, self.currency))
    }

    fn same_currency(&self, rhs: &Money) -> Result<(), FolioError> {
        if self.currency != rhs.currency {
            return Err(FolioError::invalid(
                "currency",
                format!("cannot combine {} with {}", self.currency, rhs.currency),
            ));
        }
        Ok(())
    }
}

/// # Panics
///
/// Panics if the currencies differ.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        assert_eq!(self.currency, rhs.currency, "adding money of different currencies");
        Money::new(self.amount + rhs.amount, self.currency)
    }
}

/// # Panics
///
/// Panics if the currencies differ.
impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        assert_eq!(self.currency, rhs.currency, "subtracting money of different currencies");
        Money::new(self.amount - rhs.amount, self.currency)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::new(-self.amount, self.currency)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, rhs: Decimal) -> Money {
        Money::new(self.amount * rhs, self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
