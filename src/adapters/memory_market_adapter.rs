//! In-memory market data, built up programmatically.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::error::FolioError;
use crate::domain::history::History;
use crate::domain::security::Split;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Debug, Clone, Default)]
pub struct MemoryMarketData {
    series: HashMap<String, History<Decimal>>,
    splits: HashMap<String, Vec<Split>>,
    split_adjusted: bool,
}

impl MemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(
        mut self,
        id: &str,
        points: impl IntoIterator<Item = (NaiveDate, Decimal)>,
    ) -> Self {
        let series = self.series.entry(id.to_string()).or_default();
        for (date, value) in points {
            series.append(date, value);
        }
        self
    }

    pub fn with_splits(mut self, security_id: &str, splits: impl IntoIterator<Item = Split>) -> Self {
        let entry = self.splits.entry(security_id.to_string()).or_default();
        entry.extend(splits);
        entry.sort_by_key(|s| s.date);
        self
    }

    pub fn split_adjusted_prices(mut self, adjusted: bool) -> Self {
        self.split_adjusted = adjusted;
        self
    }

    /// Record one observation, replacing any value already stored for that date.
    pub fn set(&mut self, id: &str, date: NaiveDate, value: Decimal) {
        self.series
            .entry(id.to_string())
            .or_default()
            .append(date, value);
    }

    pub fn insert_history(&mut self, id: &str, history: History<Decimal>) {
        self.series.insert(id.to_string(), history);
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

impl MarketDataPort for MemoryMarketData {
    fn history(&self, id: &str) -> Result<Option<History<Decimal>>, FolioError> {
        Ok(self.series.get(id).cloned())
    }

    fn splits(&self, security_id: &str) -> Result<Vec<Split>, FolioError> {
        Ok(self.splits.get(security_id).cloned().unwrap_or_default())
    }

    fn split_adjusted(&self) -> bool {
        self.split_adjusted
    }
}
