//! Market data stored as one CSV file per series.
//!
//! `<dir>/<ID>.csv` holds `date,value` rows; `<dir>/<ID>.splits.csv` holds
//! `date,numerator,denominator` rows. Files are read on every call.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::FolioError;
use crate::domain::history::History;
use crate::domain::security::Split;
use crate::ports::market_data_port::MarketDataPort;

pub struct CsvMarketAdapter {
    base_path: PathBuf,
    split_adjusted: bool,
}

impl CsvMarketAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            split_adjusted: false,
        }
    }

    pub fn with_split_adjusted(mut self, split_adjusted: bool) -> Self {
        self.split_adjusted = split_adjusted;
        self
    }

    fn series_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{id}.csv"))
    }

    fn splits_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{id}.splits.csv"))
    }

    /// Identifiers of every series in the directory, sorted.
    pub fn list_series(&self) -> Result<Vec<String>, FolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FolioError::MarketData {
            reason: format!(
                "failed to read directory {}: {e}",
                self.base_path.display()
            ),
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FolioError::MarketData {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".splits.csv") {
                continue;
            }
            if let Some(id) = name.strip_suffix(".csv") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, FolioError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FolioError::MarketData {
            reason: format!("failed to read {}: {e}", path.display()),
        }),
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    path: &Path,
) -> Result<&'r str, FolioError> {
    record.get(index).map(str::trim).ok_or_else(|| FolioError::MarketData {
        reason: format!("{}: missing {name} column", path.display()),
    })
}

fn parse_date(value: &str, path: &Path) -> Result<NaiveDate, FolioError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| FolioError::MarketData {
        reason: format!("{}: invalid date {value:?}: {e}", path.display()),
    })
}

fn parse_value<T: std::str::FromStr>(value: &str, name: &str, path: &Path) -> Result<T, FolioError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| FolioError::MarketData {
        reason: format!("{}: invalid {name} {value:?}: {e}", path.display()),
    })
}

impl MarketDataPort for CsvMarketAdapter {
    fn history(&self, id: &str) -> Result<Option<History<Decimal>>, FolioError> {
        let path = self.series_path(id);
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut history = History::new();
        for result in rdr.records() {
            let record = result.map_err(|e| FolioError::MarketData {
                reason: format!("{}: CSV parse error: {e}", path.display()),
            })?;
            let date = parse_date(field(&record, 0, "date", &path)?, &path)?;
            let value: Decimal = parse_value(field(&record, 1, "value", &path)?, "value", &path)?;
            history.append(date, value);
        }
        tracing::debug!(id, points = history.len(), "loaded series");
        Ok(Some(history))
    }

    fn splits(&self, security_id: &str) -> Result<Vec<Split>, FolioError> {
        let path = self.splits_path(security_id);
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut splits = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| FolioError::MarketData {
                reason: format!("{}: CSV parse error: {e}", path.display()),
            })?;
            let date = parse_date(field(&record, 0, "date", &path)?, &path)?;
            let numerator: u32 =
                parse_value(field(&record, 1, "numerator", &path)?, "numerator", &path)?;
            let denominator: u32 =
                parse_value(field(&record, 2, "denominator", &path)?, "denominator", &path)?;
            let split = Split {
                date,
                numerator,
                denominator,
            };
            split.validate(&path.display().to_string())?;
            splits.push(split);
        }
        splits.sort_by_key(|s| s.date);
        Ok(splits)
    }

    fn split_adjusted(&self) -> bool {
        self.split_adjusted
    }

    fn has(&self, id: &str) -> Result<bool, FolioError> {
        Ok(self.series_path(id).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn market_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("AAPL.csv"),
            "date,value\n2024-01-03,185.50\n2024-01-02,184.25\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("AAPL.splits.csv"),
            "date,numerator,denominator\n2020-08-31,4,1\n2014-06-09,7,1\n",
        )
        .unwrap();
        fs::write(dir.path().join("USDEUR.csv"), "date,value\n2024-01-02,0.91\n").unwrap();
        dir
    }

    #[test]
    fn reads_series_sorted() {
        let dir = market_dir();
        let adapter = CsvMarketAdapter::new(dir.path().to_path_buf());
        let history = adapter.history("AAPL").unwrap().unwrap();
        assert_eq!(history.dates(), &[d(2024, 1, 2), d(2024, 1, 3)]);
        assert_eq!(
            adapter.value_as_of("AAPL", d(2024, 1, 10)).unwrap(),
            Some(dec!(185.50))
        );
    }

    #[test]
    fn missing_series_is_none() {
        let dir = market_dir();
        let adapter = CsvMarketAdapter::new(dir.path().to_path_buf());
        assert!(adapter.history("MSFT").unwrap().is_none());
        assert!(!adapter.has("MSFT").unwrap());
        assert!(adapter.has("USDEUR").unwrap());
        assert!(adapter.splits("MSFT").unwrap().is_empty());
    }

    #[test]
    fn reads_splits_oldest_first() {
        let dir = market_dir();
        let adapter = CsvMarketAdapter::new(dir.path().to_path_buf());
        let splits = adapter.splits("AAPL").unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].date, d(2014, 6, 9));
        assert_eq!(splits[1].ratio(), dec!(4));
    }

    #[test]
    fn lists_series_without_split_files() {
        let dir = market_dir();
        let adapter = CsvMarketAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.list_series().unwrap(), vec!["AAPL", "USDEUR"]);
    }

    #[test]
    fn bad_value_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "date,value\n2024-01-02,abc\n").unwrap();
        let adapter = CsvMarketAdapter::new(dir.path().to_path_buf());
        let err = adapter.history("X").unwrap_err();
        assert!(matches!(err, FolioError::MarketData { ref reason } if reason.contains("invalid value")));
    }

    #[test]
    fn zero_split_term_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("X.splits.csv"),
            "date,numerator,denominator\n2024-01-02,2,0\n",
        )
        .unwrap();
        let adapter = CsvMarketAdapter::new(dir.path().to_path_buf());
        let err = adapter.splits("X").unwrap_err();
        assert!(matches!(err, FolioError::MarketData { ref reason } if reason.contains("2:0")));
    }

    #[test]
    fn split_adjusted_flag() {
        let adapter = CsvMarketAdapter::new(PathBuf::from(".")).with_split_adjusted(true);
        assert!(adapter.split_adjusted());
    }
}
