//! Period reports derived from two balances.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::balance::Balance;
use super::date::{Period, Range};
use super::error::FolioError;
use super::inventory::CostMethod;
use super::journal::Journal;
use super::money::Money;

/// Gains of one security over a period, in the reporting currency.
#[derive(Debug, Clone, PartialEq)]
pub struct GainsRow {
    pub ticker: String,
    pub realized: Money,
    pub unrealized_change: Money,
    pub dividends: Money,
}

impl GainsRow {
    pub fn total(&self) -> Money {
        self.realized + self.unrealized_change + self.dividends
    }

    fn is_empty(&self) -> bool {
        self.realized.is_zero() && self.unrealized_change.is_zero() && self.dividends.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GainsReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<GainsRow>,
    pub realized: Money,
    pub unrealized_change: Money,
    pub dividends: Money,
}

impl GainsReport {
    /// Gains between two snapshots. Start-of-period unrealized gain is
    /// converted with the start balance's rates, everything else with the
    /// end balance's.
    pub fn between(start: &Balance, end: &Balance) -> Result<Self, FolioError> {
        let reporting = end.reporting_currency();
        let zero = Money::zero(reporting);
        let mut report = GainsReport {
            from: start.date(),
            to: end.date(),
            rows: Vec::new(),
            realized: zero,
            unrealized_change: zero,
            dividends: zero,
        };

        for ticker in end.securities() {
            let realized = end.convert(end.realized_gain(ticker))?
                - end.convert(start.realized_gain(ticker))?;
            let dividends = end.convert(end.dividends_received(ticker))?
                - end.convert(start.dividends_received(ticker))?;
            let unrealized_change = end.convert(end.unrealized_gain(ticker))?
                - start.convert(start.unrealized_gain(ticker))?;
            let row = GainsRow {
                ticker: ticker.to_string(),
                realized,
                unrealized_change,
                dividends,
            };
            if row.is_empty() {
                continue;
            }
            report.realized = report.realized + row.realized;
            report.unrealized_change = report.unrealized_change + row.unrealized_change;
            report.dividends = report.dividends + row.dividends;
            report.rows.push(row);
        }
        Ok(report)
    }

    pub fn total(&self) -> Money {
        self.realized + self.unrealized_change + self.dividends
    }
}

/// Portfolio performance between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub start_value: Money,
    pub end_value: Money,
    /// External deposits minus withdrawals during the period.
    pub net_flow: Money,
    /// Cash-flow neutral return, e.g. `0.05` for 5%.
    pub twr: Decimal,
}

impl Performance {
    pub fn between(start: &Balance, end: &Balance) -> Self {
        let twr = if start.linked_twr().is_zero() {
            Decimal::ZERO
        } else {
            end.linked_twr() / start.linked_twr() - Decimal::ONE
        };
        Performance {
            from: start.date(),
            to: end.date(),
            start_value: start.total_portfolio_value(),
            end_value: end.total_portfolio_value(),
            net_flow: end.portfolio_cost_basis() - start.portfolio_cost_basis(),
            twr,
        }
    }

    pub fn value_change(&self) -> Money {
        self.end_value - self.start_value
    }

    /// Value change not explained by deposits and withdrawals.
    pub fn gain(&self) -> Money {
        self.value_change() - self.net_flow
    }
}

/// One [`Performance`] per period in `range`, each starting where the
/// previous one ended.
pub fn performance_by_period(
    journal: &Journal,
    range: Range,
    period: Period,
    method: CostMethod,
) -> Result<Vec<Performance>, FolioError> {
    let before = range
        .from
        .pred_opt()
        .ok_or_else(|| FolioError::invalid("from", format!("{} is out of range", range.from)))?;
    let mut start = Balance::new(journal, before, method)?;
    let mut out = Vec::new();
    for end_date in range.period_ends(period) {
        let end = Balance::new(journal, end_date, method)?;
        out.push(Performance::between(&start, &end));
        start = end;
    }
    Ok(out)
}
