//! Point-in-time portfolio snapshot built by replaying a journal.
//!
//! A [`Balance`] is computed once per `(date, method)` and never changes
//! afterwards. Exchange rates are resolved at the snapshot date and frozen,
//! so every conversion made through one balance uses the same rates.
//!
//! The time-weighted performance index is chain-linked at every external
//! cash flow: just before a deposit or withdrawal the portfolio is valued at
//! that day's prices and rates, the index is multiplied by the growth since
//! the previous flow, and the flow is then added to the base. Dividing the
//! indices of two balances therefore gives a return that does not depend on
//! when or how much money was moved in or out between them. A holding with no
//! price yet on a flow date counts at cost for that link.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::error::FolioError;
use super::inventory::{CostMethod, Inventory, Lot};
use super::journal::Journal;
use super::money::{Currency, Money};
use super::security::Security;
use super::transaction::{Transaction, TransactionKind};

/// Per-security state at the snapshot date. Amounts are in the security's currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub security: Security,
    pub position: Decimal,
    pub inventory: Inventory,
    pub realized_gain: Decimal,
    pub buys: Decimal,
    pub sells: Decimal,
    pub dividends: Decimal,
    pub price: Option<Decimal>,
}

impl Holding {
    fn new(security: Security, method: CostMethod) -> Self {
        Holding {
            security,
            position: Decimal::ZERO,
            inventory: Inventory::new(method),
            realized_gain: Decimal::ZERO,
            buys: Decimal::ZERO,
            sells: Decimal::ZERO,
            dividends: Decimal::ZERO,
            price: None,
        }
    }

    pub fn market_value(&self) -> Decimal {
        match self.price {
            Some(price) => self.position * price,
            None => Decimal::ZERO,
        }
    }

    pub fn cost_basis(&self) -> Decimal {
        self.inventory.cost_basis()
    }

    pub fn unrealized_gain(&self) -> Decimal {
        self.market_value() - self.cost_basis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterpartyAccount {
    pub currency: Currency,
    pub balance: Decimal,
}

#[derive(Debug, Clone)]
pub struct Balance {
    date: NaiveDate,
    method: CostMethod,
    reporting: Currency,
    holdings: BTreeMap<String, Holding>,
    cash: BTreeMap<Currency, Decimal>,
    cash_flow: BTreeMap<Currency, Decimal>,
    counterparties: BTreeMap<String, CounterpartyAccount>,
    rates: BTreeMap<Currency, Decimal>,
    cost_basis: Decimal,
    linked_twr: Decimal,
}

impl Balance {
    /// Replay every transaction dated on or before `date`.
    ///
    /// A date before the first transaction yields an empty balance.
    pub fn new(journal: &Journal, date: NaiveDate, method: CostMethod) -> Result<Self, FolioError> {
        Self::build(journal, date, method, true)
    }

    /// Replay positions, lots, cash and counterparty balances only.
    ///
    /// No prices or rates are looked up, so missing market data never fails
    /// the build. Prices, rates, portfolio cost basis and the performance
    /// index are left unset.
    pub fn unvalued(journal: &Journal, date: NaiveDate, method: CostMethod) -> Result<Self, FolioError> {
        Self::build(journal, date, method, false)
    }

    fn build(
        journal: &Journal,
        date: NaiveDate,
        method: CostMethod,
        valued: bool,
    ) -> Result<Self, FolioError> {
        let reporting = journal.reporting_currency();
        match journal.ledger().inception() {
            Some(first) if first <= date => {}
            _ => return Ok(Balance::empty(date, method, reporting)),
        }

        let mut replay = Replay::new(journal, method, valued);
        let mut replayed = 0usize;
        for tx in journal.ledger().up_to(date) {
            replay.apply_splits(tx.date);
            replay.apply(tx)?;
            replayed += 1;
        }
        replay.apply_splits(date);
        tracing::debug!(%date, %method, replayed, valued, "replayed ledger");
        replay.finish(date)
    }

    pub fn empty(date: NaiveDate, method: CostMethod, reporting: Currency) -> Self {
        Balance {
            date,
            method,
            reporting,
            holdings: BTreeMap::new(),
            cash: BTreeMap::new(),
            cash_flow: BTreeMap::new(),
            counterparties: BTreeMap::new(),
            rates: BTreeMap::new(),
            cost_basis: Decimal::ZERO,
            linked_twr: Decimal::ONE,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn method(&self) -> CostMethod {
        self.method
    }

    pub fn reporting_currency(&self) -> Currency {
        self.reporting
    }

    /// Tickers of every security declared up to the snapshot date.
    pub fn securities(&self) -> impl Iterator<Item = &str> {
        self.holdings.keys().map(String::as_str)
    }

    pub fn holding(&self, ticker: &str) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    pub fn position(&self, ticker: &str) -> Decimal {
        self.holdings
            .get(ticker)
            .map(|h| h.position)
            .unwrap_or_default()
    }

    pub fn price(&self, ticker: &str) -> Option<Money> {
        let holding = self.holdings.get(ticker)?;
        holding
            .price
            .map(|p| Money::new(p, holding.security.currency))
    }

    pub fn market_value(&self, ticker: &str) -> Money {
        self.holding_money(ticker, Holding::market_value)
    }

    pub fn cost_basis(&self, ticker: &str) -> Money {
        self.holding_money(ticker, Holding::cost_basis)
    }

    pub fn unrealized_gain(&self, ticker: &str) -> Money {
        self.holding_money(ticker, Holding::unrealized_gain)
    }

    pub fn realized_gain(&self, ticker: &str) -> Money {
        self.holding_money(ticker, |h| h.realized_gain)
    }

    /// Gross amount spent buying `ticker`.
    pub fn buys(&self, ticker: &str) -> Money {
        self.holding_money(ticker, |h| h.buys)
    }

    /// Gross proceeds from selling `ticker`.
    pub fn sells(&self, ticker: &str) -> Money {
        self.holding_money(ticker, |h| h.sells)
    }

    pub fn dividends_received(&self, ticker: &str) -> Money {
        self.holding_money(ticker, |h| h.dividends)
    }

    /// Open FIFO lots of `ticker`, oldest first.
    pub fn lots(&self, ticker: &str) -> impl Iterator<Item = &Lot> {
        self.holdings
            .get(ticker)
            .into_iter()
            .flat_map(|h| h.inventory.lots())
    }

    fn holding_money(&self, ticker: &str, f: impl Fn(&Holding) -> Decimal) -> Money {
        match self.holdings.get(ticker) {
            Some(h) => Money::new(f(h), h.security.currency),
            None => Money::zero(self.reporting),
        }
    }

    /// Currencies holding cash.
    pub fn currencies(&self) -> impl Iterator<Item = Currency> + '_ {
        self.cash.keys().copied()
    }

    pub fn cash(&self, currency: Currency) -> Money {
        Money::new(
            self.cash.get(&currency).copied().unwrap_or_default(),
            currency,
        )
    }

    /// Net external deposits, withdrawals and conversion legs in `currency`.
    pub fn cash_flow(&self, currency: Currency) -> Money {
        Money::new(
            self.cash_flow.get(&currency).copied().unwrap_or_default(),
            currency,
        )
    }

    pub fn counterparties(&self) -> impl Iterator<Item = &str> {
        self.counterparties.keys().map(String::as_str)
    }

    pub fn counterparty(&self, account: &str) -> Money {
        match self.counterparties.get(account) {
            Some(acc) => Money::new(acc.balance, acc.currency),
            None => Money::zero(self.reporting),
        }
    }

    pub fn counterparty_currency(&self, account: &str) -> Option<Currency> {
        self.counterparties.get(account).map(|a| a.currency)
    }

    /// Frozen rate of one unit of `currency` in the reporting currency.
    pub fn rate(&self, currency: Currency) -> Option<Decimal> {
        if currency == self.reporting {
            return Some(Decimal::ONE);
        }
        self.rates.get(&currency).copied()
    }

    /// Convert to the reporting currency at the snapshot's frozen rate.
    pub fn convert(&self, money: Money) -> Result<Money, FolioError> {
        let rate = self.rate(money.currency).ok_or(FolioError::MissingRate {
            currency: money.currency,
            date: Some(self.date),
        })?;
        Ok(Money::new(money.amount * rate, self.reporting))
    }

    /// Convert to `currency` through the reporting currency.
    pub fn convert_to(&self, money: Money, currency: Currency) -> Result<Money, FolioError> {
        if money.currency == currency {
            return Ok(money);
        }
        let reporting = self.convert(money)?;
        let rate = self.rate(currency).ok_or(FolioError::MissingRate {
            currency,
            date: Some(self.date),
        })?;
        if rate.is_zero() {
            return Err(FolioError::invalid(
                "rate",
                format!("zero exchange rate for {currency}"),
            ));
        }
        Ok(Money::new(reporting.amount / rate, currency))
    }

    // Every currency the snapshot holds has a frozen rate.
    fn reporting_amount(&self, amount: Decimal, currency: Currency) -> Decimal {
        amount * self.rate(currency).unwrap_or_default()
    }

    fn total(&self, amounts: impl Iterator<Item = (Decimal, Currency)>) -> Money {
        let sum = amounts
            .map(|(amount, currency)| self.reporting_amount(amount, currency))
            .sum();
        Money::new(sum, self.reporting)
    }

    pub fn total_market_value(&self) -> Money {
        self.total(
            self.holdings
                .values()
                .map(|h| (h.market_value(), h.security.currency)),
        )
    }

    pub fn total_cost_basis(&self) -> Money {
        self.total(
            self.holdings
                .values()
                .map(|h| (h.cost_basis(), h.security.currency)),
        )
    }

    pub fn total_unrealized_gain(&self) -> Money {
        self.total(
            self.holdings
                .values()
                .map(|h| (h.unrealized_gain(), h.security.currency)),
        )
    }

    pub fn total_realized_gain(&self) -> Money {
        self.total(
            self.holdings
                .values()
                .map(|h| (h.realized_gain, h.security.currency)),
        )
    }

    pub fn total_dividends(&self) -> Money {
        self.total(
            self.holdings
                .values()
                .map(|h| (h.dividends, h.security.currency)),
        )
    }

    pub fn total_cash(&self) -> Money {
        self.total(self.cash.iter().map(|(c, amount)| (*amount, *c)))
    }

    pub fn total_counterparty(&self) -> Money {
        self.total(
            self.counterparties
                .values()
                .map(|acc| (acc.balance, acc.currency)),
        )
    }

    pub fn total_portfolio_value(&self) -> Money {
        self.total_market_value() + self.total_cash() + self.total_counterparty()
    }

    /// Contributed capital: every external deposit and withdrawal converted at
    /// the rate of its own date.
    pub fn portfolio_cost_basis(&self) -> Money {
        Money::new(self.cost_basis, self.reporting)
    }

    /// Chain-linked time-weighted performance index, 1 at inception.
    pub fn linked_twr(&self) -> Decimal {
        self.linked_twr
    }
}

/// Mutable state while replaying a journal.
struct Replay<'j> {
    journal: &'j Journal,
    method: CostMethod,
    valued: bool,
    holdings: BTreeMap<String, Holding>,
    cash: BTreeMap<Currency, Decimal>,
    cash_flow: BTreeMap<Currency, Decimal>,
    counterparties: BTreeMap<String, CounterpartyAccount>,
    applied_splits: HashMap<String, usize>,
    cost_basis: Decimal,
    index: Decimal,
    base: Option<Decimal>,
}

impl<'j> Replay<'j> {
    fn new(journal: &'j Journal, method: CostMethod, valued: bool) -> Self {
        Replay {
            journal,
            method,
            valued,
            holdings: BTreeMap::new(),
            cash: BTreeMap::new(),
            cash_flow: BTreeMap::new(),
            counterparties: BTreeMap::new(),
            applied_splits: HashMap::new(),
            cost_basis: Decimal::ZERO,
            index: Decimal::ONE,
            base: None,
        }
    }

    /// Apply splits effective on or before `date` that have not been applied yet.
    fn apply_splits(&mut self, date: NaiveDate) {
        for (ticker, holding) in self.holdings.iter_mut() {
            let splits = self.journal.splits(ticker);
            let applied = self.applied_splits.entry(ticker.clone()).or_insert(0);
            while *applied < splits.len() && splits[*applied].date <= date {
                let ratio = splits[*applied].ratio();
                holding.position *= ratio;
                holding.inventory.split(ratio);
                *applied += 1;
            }
        }
    }

    fn holding_mut(&mut self, ticker: &str) -> Result<&mut Holding, FolioError> {
        self.holdings
            .get_mut(ticker)
            .ok_or_else(|| FolioError::UnknownSecurity {
                ticker: ticker.to_string(),
            })
    }

    fn apply(&mut self, tx: &Transaction) -> Result<(), FolioError> {
        tracing::trace!(%tx, "apply");
        match &tx.kind {
            TransactionKind::Declare {
                ticker,
                id,
                currency,
            } => {
                if !self.holdings.contains_key(ticker) {
                    let security = Security {
                        id: id.clone(),
                        ticker: ticker.clone(),
                        currency: *currency,
                    };
                    // Splits before the declaration do not concern this ledger.
                    let already = self
                        .journal
                        .splits(ticker)
                        .partition_point(|s| s.date <= tx.date);
                    self.applied_splits.insert(ticker.clone(), already);
                    self.holdings
                        .insert(ticker.clone(), Holding::new(security, self.method));
                }
            }
            TransactionKind::Buy {
                ticker,
                quantity,
                amount,
                currency,
            } => {
                let holding = self.holding_mut(ticker)?;
                let currency = currency.unwrap_or(holding.security.currency);
                holding.position += *quantity;
                holding.inventory.add(tx.date, *quantity, *amount);
                holding.buys += *amount;
                *self.cash.entry(currency).or_default() -= *amount;
            }
            TransactionKind::Sell {
                ticker,
                quantity,
                amount,
                currency,
            } => {
                let holding = self.holding_mut(ticker)?;
                let currency = currency.unwrap_or(holding.security.currency);
                let quantity = quantity.unwrap_or(holding.position);
                if quantity > holding.position {
                    tracing::warn!(
                        %ticker,
                        %quantity,
                        position = %holding.position,
                        "sell exceeds position"
                    );
                }
                let released = holding.inventory.remove(quantity);
                holding.realized_gain += *amount - released;
                holding.position -= quantity;
                holding.sells += *amount;
                *self.cash.entry(currency).or_default() += *amount;
            }
            TransactionKind::Dividend {
                ticker,
                amount,
                currency,
            } => {
                let holding = self.holding_mut(ticker)?;
                let currency = currency.unwrap_or(holding.security.currency);
                holding.dividends += *amount;
                *self.cash.entry(currency).or_default() += *amount;
            }
            TransactionKind::Deposit {
                amount,
                currency,
                settles,
            } => {
                match settles {
                    Some(account) => self.settle(account, *currency, -*amount),
                    None => self.external_flow(tx.date, *currency, *amount)?,
                }
                *self.cash.entry(*currency).or_default() += *amount;
            }
            TransactionKind::Withdraw {
                amount,
                currency,
                settles,
            } => {
                let held = self.cash.get(currency).copied().unwrap_or_default();
                let amount = amount.unwrap_or(held);
                match settles {
                    Some(account) => self.settle(account, *currency, amount),
                    None => self.external_flow(tx.date, *currency, -amount)?,
                }
                *self.cash.entry(*currency).or_default() -= amount;
            }
            TransactionKind::Convert {
                from_currency,
                from_amount,
                to_currency,
                to_amount,
            } => {
                let held = self.cash.get(from_currency).copied().unwrap_or_default();
                let from_amount = from_amount.unwrap_or(held);
                *self.cash.entry(*from_currency).or_default() -= from_amount;
                *self.cash.entry(*to_currency).or_default() += *to_amount;
                *self.cash_flow.entry(*from_currency).or_default() -= from_amount;
                *self.cash_flow.entry(*to_currency).or_default() += *to_amount;
            }
            TransactionKind::Accrue {
                account,
                amount,
                currency,
                ..
            } => self.settle(account, *currency, *amount),
            TransactionKind::UpdatePrice { .. } => {}
        }
        Ok(())
    }

    fn settle(&mut self, account: &str, currency: Currency, amount: Decimal) {
        let entry = self
            .counterparties
            .entry(account.to_string())
            .or_insert(CounterpartyAccount {
                currency,
                balance: Decimal::ZERO,
            });
        entry.balance += amount;
    }

    /// Link the performance index up to `date`, then book the flow.
    fn external_flow(
        &mut self,
        date: NaiveDate,
        currency: Currency,
        amount: Decimal,
    ) -> Result<(), FolioError> {
        *self.cash_flow.entry(currency).or_default() += amount;
        if !self.valued {
            return Ok(());
        }
        let rate = self
            .journal
            .rate_as_of(currency, date)
            .ok_or(FolioError::MissingRate {
                currency,
                date: Some(date),
            })?;
        let flow = amount * rate;
        let value = self.value_at(date)?;
        if let Some(base) = self.base {
            if base > Decimal::ZERO {
                self.index *= value / base;
            }
        }
        self.base = Some(value + flow);
        self.cost_basis += flow;
        Ok(())
    }

    fn rate_at(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, FolioError> {
        self.journal
            .rate_as_of(currency, date)
            .ok_or(FolioError::MissingRate {
                currency,
                date: Some(date),
            })
    }

    /// Portfolio value in the reporting currency at `date` prices and rates.
    /// Holdings without a price on or before `date` count at cost.
    fn value_at(&self, date: NaiveDate) -> Result<Decimal, FolioError> {
        let mut total = Decimal::ZERO;
        for (ticker, holding) in &self.holdings {
            if holding.position.is_zero() {
                continue;
            }
            let value = match self.journal.price_as_of(ticker, date) {
                Some(price) => holding.position * price,
                None => {
                    tracing::debug!(%ticker, %date, "no price yet, valued at cost");
                    holding.cost_basis()
                }
            };
            total += value * self.rate_at(holding.security.currency, date)?;
        }
        for (currency, amount) in &self.cash {
            if !amount.is_zero() {
                total += *amount * self.rate_at(*currency, date)?;
            }
        }
        for account in self.counterparties.values() {
            if !account.balance.is_zero() {
                total += account.balance * self.rate_at(account.currency, date)?;
            }
        }
        Ok(total)
    }

    fn finish(mut self, date: NaiveDate) -> Result<Balance, FolioError> {
        let reporting = self.journal.reporting_currency();
        if !self.valued {
            return Ok(Balance {
                date,
                method: self.method,
                reporting,
                holdings: self.holdings,
                cash: self.cash,
                cash_flow: self.cash_flow,
                counterparties: self.counterparties,
                rates: BTreeMap::new(),
                cost_basis: Decimal::ZERO,
                linked_twr: Decimal::ONE,
            });
        }

        for (ticker, holding) in self.holdings.iter_mut() {
            holding.price = self.journal.price_as_of(ticker, date);
            if holding.price.is_none() && !holding.position.is_zero() {
                return Err(FolioError::MissingPrice {
                    ticker: ticker.clone(),
                    date,
                });
            }
        }

        let observed: BTreeSet<Currency> = self
            .holdings
            .values()
            .map(|h| h.security.currency)
            .chain(self.cash.keys().copied())
            .chain(self.cash_flow.keys().copied())
            .chain(self.counterparties.values().map(|a| a.currency))
            .filter(|c| *c != reporting)
            .collect();
        let mut rates = BTreeMap::new();
        for currency in observed {
            rates.insert(currency, self.rate_at(currency, date)?);
        }

        let value = self.value_at(date)?;
        let linked_twr = match self.base {
            Some(base) if base > Decimal::ZERO => self.index * value / base,
            _ => self.index,
        };

        Ok(Balance {
            date,
            method: self.method,
            reporting,
            holdings: self.holdings,
            cash: self.cash,
            cash_flow: self.cash_flow,
            counterparties: self.counterparties,
            rates,
            cost_basis: self.cost_basis,
            linked_twr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_market_adapter::MemoryMarketData;
    use crate::domain::ledger::Ledger;
    use crate::domain::security::Split;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ccy(code: &str) -> Currency {
        code.parse().unwrap()
    }

    fn tx(date: NaiveDate, kind: TransactionKind) -> Transaction {
        Transaction::new(date, kind)
    }

    fn declare() -> Transaction {
        tx(
            d(2024, 1, 1),
            TransactionKind::Declare {
                ticker: "ACME".into(),
                id: "US0000000001".into(),
                currency: ccy("USD"),
            },
        )
    }

    fn deposit(date: NaiveDate, amount: Decimal) -> Transaction {
        tx(
            date,
            TransactionKind::Deposit {
                amount,
                currency: ccy("USD"),
                settles: None,
            },
        )
    }

    fn buy(date: NaiveDate, quantity: Decimal, amount: Decimal) -> Transaction {
        tx(
            date,
            TransactionKind::Buy {
                ticker: "ACME".into(),
                quantity,
                amount,
                currency: None,
            },
        )
    }

    fn sell(date: NaiveDate, quantity: Option<Decimal>, amount: Decimal) -> Transaction {
        tx(
            date,
            TransactionKind::Sell {
                ticker: "ACME".into(),
                quantity,
                amount,
                currency: None,
            },
        )
    }

    fn market() -> MemoryMarketData {
        MemoryMarketData::new().with_prices(
            "US0000000001",
            [
                (d(2024, 1, 1), dec!(10)),
                (d(2024, 2, 1), dec!(20)),
                (d(2024, 3, 1), dec!(30)),
            ],
        )
    }

    fn journal(txs: Vec<Transaction>) -> Journal {
        Journal::new(Ledger::from_transactions(txs), ccy("USD"), &market()).unwrap()
    }

    fn trading_journal() -> Journal {
        journal(vec![
            declare(),
            deposit(d(2024, 1, 1), dec!(1000)),
            buy(d(2024, 1, 2), dec!(10), dec!(100)),
            buy(d(2024, 2, 2), dec!(10), dec!(200)),
            sell(d(2024, 3, 2), Some(dec!(15)), dec!(450)),
        ])
    }

    #[test]
    fn fifo_realized_gain() {
        let b = Balance::new(&trading_journal(), d(2024, 3, 31), CostMethod::Fifo).unwrap();
        assert_eq!(b.position("ACME"), dec!(5));
        // proceeds 450 - (100 + 100)
        assert_eq!(b.realized_gain("ACME").amount, dec!(250));
        assert_eq!(b.cost_basis("ACME").amount, dec!(100));
        assert_eq!(b.market_value("ACME").amount, dec!(150));
        assert_eq!(b.unrealized_gain("ACME").amount, dec!(50));
        assert_eq!(b.lots("ACME").count(), 1);
    }

    #[test]
    fn average_cost_realized_gain() {
        let b = Balance::new(&trading_journal(), d(2024, 3, 31), CostMethod::AverageCost).unwrap();
        assert_eq!(b.position("ACME"), dec!(5));
        // proceeds 450 - 15 * 15
        assert_eq!(b.realized_gain("ACME").amount, dec!(225));
        assert_eq!(b.cost_basis("ACME").amount, dec!(75));
        assert_eq!(b.market_value("ACME").amount, dec!(150));
        assert_eq!(b.unrealized_gain("ACME").amount, dec!(75));
    }

    #[test]
    fn trades_move_cash_and_totals() {
        let b = Balance::new(&trading_journal(), d(2024, 3, 31), CostMethod::Fifo).unwrap();
        assert_eq!(b.cash(ccy("USD")).amount, dec!(1150));
        assert_eq!(b.cash_flow(ccy("USD")).amount, dec!(1000));
        assert_eq!(b.buys("ACME").amount, dec!(300));
        assert_eq!(b.sells("ACME").amount, dec!(450));
        assert_eq!(b.total_portfolio_value().amount, dec!(1300));
        assert_eq!(b.portfolio_cost_basis().amount, dec!(1000));
        assert_eq!(b.securities().collect::<Vec<_>>(), vec!["ACME"]);
    }

    #[test]
    fn before_inception_is_empty() {
        let b = Balance::new(&trading_journal(), d(2023, 12, 31), CostMethod::Fifo).unwrap();
        assert_eq!(b.securities().count(), 0);
        assert!(b.total_portfolio_value().is_zero());
        assert_eq!(b.linked_twr(), dec!(1));
    }

    #[test]
    fn sell_all_sells_position() {
        let j = journal(vec![
            declare(),
            deposit(d(2024, 1, 1), dec!(1000)),
            buy(d(2024, 1, 2), dec!(10), dec!(100)),
            sell(d(2024, 2, 2), None, dec!(200)),
        ]);
        let b = Balance::new(&j, d(2024, 2, 2), CostMethod::Fifo).unwrap();
        assert!(b.position("ACME").is_zero());
        assert_eq!(b.realized_gain("ACME").amount, dec!(100));
    }

    #[test]
    fn undeclared_ticker_is_a_reference_error() {
        let j = Journal::new(
            Ledger::from_transactions([buy(d(2024, 1, 2), dec!(1), dec!(10))]),
            ccy("USD"),
            &market(),
        )
        .unwrap();
        let err = Balance::new(&j, d(2024, 1, 2), CostMethod::Fifo).unwrap_err();
        assert!(matches!(err, FolioError::UnknownSecurity { ref ticker } if ticker == "ACME"));
    }

    #[test]
    fn missing_price_for_held_position_is_an_error() {
        let market = MemoryMarketData::new().with_prices("US0000000001", [(d(2024, 2, 1), dec!(20))]);
        let j = Journal::new(
            Ledger::from_transactions([declare(), buy(d(2024, 1, 2), dec!(1), dec!(10))]),
            ccy("USD"),
            &market,
        )
        .unwrap();
        let err = Balance::new(&j, d(2024, 1, 15), CostMethod::Fifo).unwrap_err();
        assert!(matches!(err, FolioError::MissingPrice { .. }));
        assert!(Balance::new(&j, d(2024, 2, 1), CostMethod::Fifo).is_ok());
    }

    #[test]
    fn flow_before_first_price_links_at_cost() {
        let market = MemoryMarketData::new();
        let j = Journal::new(
            Ledger::from_transactions([
                declare(),
                deposit(d(2024, 1, 1), dec!(1000)),
                buy(d(2024, 1, 2), dec!(10), dec!(100)),
                deposit(d(2024, 1, 15), dec!(50)),
                tx(
                    d(2024, 1, 31),
                    TransactionKind::UpdatePrice {
                        ticker: "ACME".into(),
                        price: dec!(12),
                    },
                ),
            ]),
            ccy("USD"),
            &market,
        )
        .unwrap();
        let b = Balance::new(&j, d(2024, 2, 29), CostMethod::Fifo).unwrap();
        assert_eq!(b.market_value("ACME").amount, dec!(120));
        assert_eq!(b.portfolio_cost_basis().amount, dec!(1050));
        // 1000 at cost on the 15th, then 1070 against a base of 1050
        assert_eq!(b.linked_twr(), dec!(1070) / dec!(1050));
    }

    #[test]
    fn unvalued_balance_ignores_missing_prices() {
        let market = MemoryMarketData::new().with_prices("US0000000001", [(d(2024, 1, 31), dec!(12))]);
        let j = Journal::new(
            Ledger::from_transactions([
                declare(),
                deposit(d(2024, 1, 1), dec!(1000)),
                buy(d(2024, 1, 2), dec!(10), dec!(100)),
            ]),
            ccy("USD"),
            &market,
        )
        .unwrap();
        assert!(Balance::new(&j, d(2024, 1, 19), CostMethod::Fifo).is_err());
        let b = Balance::unvalued(&j, d(2024, 1, 19), CostMethod::Fifo).unwrap();
        assert_eq!(b.position("ACME"), dec!(10));
        assert_eq!(b.cash(ccy("USD")).amount, dec!(900));
        assert_eq!(b.cash_flow(ccy("USD")).amount, dec!(1000));
        assert!(b.price("ACME").is_none());
    }

    #[test]
    fn split_adjusts_position_from_effective_date() {
        let market = market().with_splits(
            "US0000000001",
            [Split {
                date: d(2024, 2, 15),
                numerator: 2,
                denominator: 1,
            }],
        );
        let j = Journal::new(
            Ledger::from_transactions([
                declare(),
                deposit(d(2024, 1, 1), dec!(1000)),
                buy(d(2024, 1, 2), dec!(10), dec!(100)),
                buy(d(2024, 2, 15), dec!(1), dec!(10)),
            ]),
            ccy("USD"),
            &market,
        )
        .unwrap();
        let before = Balance::new(&j, d(2024, 2, 14), CostMethod::Fifo).unwrap();
        assert_eq!(before.position("ACME"), dec!(10));
        let after = Balance::new(&j, d(2024, 2, 15), CostMethod::Fifo).unwrap();
        assert_eq!(after.position("ACME"), dec!(21));
        assert_eq!(after.cost_basis("ACME").amount, dec!(110));
        assert_eq!(after.position("ACME"), j.position("ACME", d(2024, 2, 15)));
    }

    #[test]
    fn counterparty_accrual_and_settlement() {
        let j = journal(vec![
            tx(
                d(2024, 1, 1),
                TransactionKind::Accrue {
                    account: "employer".into(),
                    amount: dec!(500),
                    currency: ccy("USD"),
                    create: true,
                },
            ),
            tx(
                d(2024, 1, 5),
                TransactionKind::Deposit {
                    amount: dec!(300),
                    currency: ccy("USD"),
                    settles: Some("employer".into()),
                },
            ),
        ]);
        let b = Balance::new(&j, d(2024, 1, 5), CostMethod::Fifo).unwrap();
        assert_eq!(b.counterparty("employer").amount, dec!(200));
        assert_eq!(b.counterparty_currency("employer"), Some(ccy("USD")));
        assert_eq!(b.cash(ccy("USD")).amount, dec!(300));
        assert_eq!(b.total_counterparty().amount, dec!(200));
        assert!(b.cash_flow(ccy("USD")).is_zero());
        assert!(b.portfolio_cost_basis().is_zero());
        assert_eq!(b.total_portfolio_value().amount, dec!(500));
    }

    #[test]
    fn twr_ignores_flow_timing() {
        // The February deposit is linked in at February's value, so only
        // price movement shows up in the index.
        let j = journal(vec![
            declare(),
            deposit(d(2024, 1, 1), dec!(100)),
            buy(d(2024, 1, 1), dec!(10), dec!(100)),
            deposit(d(2024, 2, 1), dec!(1000)),
        ]);
        let start = Balance::new(&j, d(2024, 1, 1), CostMethod::Fifo).unwrap();
        let end = Balance::new(&j, d(2024, 3, 1), CostMethod::Fifo).unwrap();
        assert_eq!(start.linked_twr(), dec!(1));
        // Jan→Feb: 100 → 200 (x2); Feb→Mar: 1200 → 1300
        let expected = dec!(2) * dec!(1300) / dec!(1200);
        assert_eq!(end.linked_twr(), expected);
    }
}
