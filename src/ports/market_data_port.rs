//! Market data port trait: price, exchange-rate and split series.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::error::FolioError;
use crate::domain::history::History;
use crate::domain::security::Split;

/// Series are keyed by identifier: a security id (or ticker) for prices,
/// a concatenated currency pair such as `USDEUR` for exchange rates.
pub trait MarketDataPort {
    /// Full series for `id`, or `None` when the source has no such series.
    fn history(&self, id: &str) -> Result<Option<History<Decimal>>, FolioError>;

    /// Splits of a security, oldest first.
    fn splits(&self, security_id: &str) -> Result<Vec<Split>, FolioError>;

    /// True when stored prices are already adjusted for splits, in which case
    /// positions must not be adjusted either.
    fn split_adjusted(&self) -> bool {
        false
    }

    fn has(&self, id: &str) -> Result<bool, FolioError> {
        Ok(self.history(id)?.is_some())
    }

    fn value_as_of(&self, id: &str, date: NaiveDate) -> Result<Option<Decimal>, FolioError> {
        Ok(self
            .history(id)?
            .and_then(|h| h.value_as_of(date).copied()))
    }
}
