//! A ledger bound to a reporting currency and the market data needed to value it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::error::FolioError;
use super::history::History;
use super::ledger::Ledger;
use super::money::Currency;
use super::security::Split;
use super::transaction::TransactionKind;
use crate::ports::market_data_port::MarketDataPort;

/// Owns its ledger and a copy of every series it resolved, so later changes
/// to the market data source do not affect it.
#[derive(Debug, Clone)]
pub struct Journal {
    ledger: Ledger,
    reporting: Currency,
    prices: HashMap<String, History<Decimal>>,
    rates: HashMap<Currency, History<Decimal>>,
    splits: HashMap<String, Vec<Split>>,
}

impl Journal {
    /// Resolve a price series for every declared security and a rate series
    /// for every non-reporting currency. Fails if any series is absent
    /// altogether; gaps at particular dates are only detected when a balance
    /// needs them.
    pub fn new(
        ledger: Ledger,
        reporting: Currency,
        market: &dyn MarketDataPort,
    ) -> Result<Self, FolioError> {
        let mut observed: HashMap<String, History<Decimal>> = HashMap::new();
        for tx in ledger.transactions() {
            if let TransactionKind::UpdatePrice { ticker, price } = &tx.kind {
                observed
                    .entry(ticker.clone())
                    .or_default()
                    .append(tx.date, *price);
            }
        }

        let mut prices = HashMap::new();
        let mut splits = HashMap::new();
        for security in ledger.securities() {
            let mut series = match market.history(&security.id)? {
                Some(h) => Some(h),
                None => market.history(&security.ticker)?,
            };
            if let Some(updates) = observed.remove(&security.ticker) {
                let merged = series.get_or_insert_with(History::new);
                for (date, price) in updates.iter() {
                    merged.append(date, *price);
                }
            }
            let Some(series) = series else {
                return Err(FolioError::MissingSeries {
                    id: security.id.clone(),
                });
            };
            prices.insert(security.ticker.clone(), series);

            if !market.split_adjusted() {
                let mut security_splits = market.splits(&security.id)?;
                for split in &security_splits {
                    split.validate(&security.id)?;
                }
                security_splits.sort_by_key(|s| s.date);
                if !security_splits.is_empty() {
                    splits.insert(security.ticker.clone(), security_splits);
                }
            }
        }

        let mut rates = HashMap::new();
        for &currency in ledger.currencies() {
            if currency == reporting {
                continue;
            }
            let series = resolve_rate(market, currency, reporting)?.ok_or(
                FolioError::MissingRate {
                    currency,
                    date: None,
                },
            )?;
            rates.insert(currency, series);
        }

        tracing::info!(
            transactions = ledger.len(),
            securities = prices.len(),
            currencies = rates.len(),
            reporting = %reporting,
            "journal built"
        );

        Ok(Journal {
            ledger,
            reporting,
            prices,
            rates,
            splits,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    pub fn reporting_currency(&self) -> Currency {
        self.reporting
    }

    pub fn price_history(&self, ticker: &str) -> Option<&History<Decimal>> {
        self.prices.get(ticker)
    }

    pub fn price_as_of(&self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        self.prices.get(ticker)?.value_as_of(date).copied()
    }

    /// Value of one unit of `currency` in the reporting currency.
    pub fn rate_as_of(&self, currency: Currency, date: NaiveDate) -> Option<Decimal> {
        if currency == self.reporting {
            return Some(Decimal::ONE);
        }
        self.rates.get(&currency)?.value_as_of(date).copied()
    }

    pub fn splits(&self, ticker: &str) -> &[Split] {
        self.splits.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Split-adjusted position of `ticker` at `date`.
    pub fn position(&self, ticker: &str, date: NaiveDate) -> Decimal {
        self.ledger.position(ticker, date, self.splits(ticker))
    }
}

/// Look up `<FROM><TO>`, falling back to the inverted `<TO><FROM>` series.
fn resolve_rate(
    market: &dyn MarketDataPort,
    from: Currency,
    to: Currency,
) -> Result<Option<History<Decimal>>, FolioError> {
    if let Some(direct) = market.history(&format!("{from}{to}"))? {
        return Ok(Some(direct));
    }
    let Some(inverse) = market.history(&format!("{to}{from}"))? else {
        return Ok(None);
    };
    let inverted: History<Decimal> = inverse
        .iter()
        .filter(|(_, v)| !v.is_zero())
        .map(|(date, v)| (date, Decimal::ONE / *v))
        .collect();
    Ok(Some(inverted))
}
