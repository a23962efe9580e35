//! Calendar periods and closed date ranges.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

use super::error::FolioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => date,
            Period::Weekly => {
                date - Days::new(u64::from(date.weekday().num_days_from_monday()))
            }
            Period::Monthly => date.with_day(1).unwrap_or(date),
            Period::Quarterly => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
            Period::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Last day of the period containing `date`.
    pub fn end_of(self, date: NaiveDate) -> NaiveDate {
        let start = self.start_of(date);
        let next = match self {
            Period::Daily => start.checked_add_days(Days::new(1)),
            Period::Weekly => start.checked_add_days(Days::new(7)),
            Period::Monthly => start.checked_add_months(Months::new(1)),
            Period::Quarterly => start.checked_add_months(Months::new(3)),
            Period::Yearly => start.checked_add_months(Months::new(12)),
        };
        next.and_then(|n| n.pred_opt()).unwrap_or(NaiveDate::MAX)
    }
}

impl FromStr for Period {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(Period::Daily),
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            "quarterly" | "quarter" => Ok(Period::Quarterly),
            "yearly" | "year" | "annual" => Ok(Period::Yearly),
            _ => Err(FolioError::invalid("period", format!("unknown period {s:?}"))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

/// Closed interval `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Range {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, FolioError> {
        if from > to {
            return Err(FolioError::invalid(
                "range",
                format!("{from} is after {to}"),
            ));
        }
        Ok(Range { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of calendar days in the range, both ends included.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// End date of every period overlapping the range, the last one clipped to `to`.
    pub fn period_ends(&self, period: Period) -> Vec<NaiveDate> {
        let mut ends = Vec::new();
        let mut cursor = self.from;
        loop {
            let end = period.end_of(cursor);
            if end >= self.to {
                ends.push(self.to);
                break;
            }
            ends.push(end);
            match end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }
        ends
    }
}
