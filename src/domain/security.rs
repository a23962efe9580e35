//! Declared securities and stock splits.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::FolioError;
use super::money::Currency;

/// A tradable instrument. Its currency is fixed when declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Security {
    pub id: String,
    pub ticker: String,
    pub currency: Currency,
}

/// A stock split effective on `date`: every `denominator` shares become `numerator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub date: NaiveDate,
    pub numerator: u32,
    pub denominator: u32,
}

impl Split {
    /// Both terms must be positive.
    pub fn validate(&self, id: &str) -> Result<(), FolioError> {
        if self.numerator == 0 || self.denominator == 0 {
            return Err(FolioError::MarketData {
                reason: format!(
                    "{id}: split on {} has non-positive ratio {}:{}",
                    self.date, self.numerator, self.denominator
                ),
            });
        }
        Ok(())
    }

    /// Callers hold validated splits; a zero denominator yields zero.
    pub fn ratio(&self) -> Decimal {
        Decimal::from(self.numerator)
            .checked_div(Decimal::from(self.denominator))
            .unwrap_or_default()
    }
}

/// Product of the ratios of splits effective strictly after `after` and on or before `through`.
pub fn adjustment_factor(splits: &[Split], after: NaiveDate, through: NaiveDate) -> Decimal {
    splits
        .iter()
        .filter(|s| s.date > after && s.date <= through)
        .fold(Decimal::ONE, |acc, s| acc * s.ratio())
}
