//! Append-only, date-ordered transaction log with derived indices.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use super::money::Currency;
use super::security::{Security, Split, adjustment_factor};
use super::transaction::{Transaction, TransactionKind};

/// Transactions in stable date order (equal dates keep append order), plus
/// the declared securities, counterparty accounts and currencies seen so far.
///
/// A security or account is indexed by the transaction that comes first in
/// ledger order, the same one a replay meets first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    securities: BTreeMap<String, (NaiveDate, Security)>,
    accounts: BTreeMap<String, (NaiveDate, Currency)>,
    currencies: BTreeSet<Currency>,
}

/// Insert unless an entry dated on or before `date` is already there. Equal
/// dates keep the existing entry, which sorts first.
fn keep_earliest<V>(
    map: &mut BTreeMap<String, (NaiveDate, V)>,
    key: &str,
    date: NaiveDate,
    value: V,
) {
    match map.get(key) {
        Some((existing, _)) if *existing <= date => {}
        _ => {
            map.insert(key.to_string(), (date, value));
        }
    }
}

/// Cash per currency and counterparty balances after a replay.
#[derive(Debug, Default)]
struct CashState {
    cash: BTreeMap<Currency, Decimal>,
    counterparties: BTreeMap<String, Decimal>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transactions(transactions: impl IntoIterator<Item = Transaction>) -> Self {
        let mut ledger = Ledger::new();
        ledger.append(transactions);
        ledger
    }

    /// Add transactions and restore date order.
    ///
    /// A transaction dated earlier than existing ones lands after every
    /// existing transaction of a strictly earlier date and before those of the
    /// same or a later date.
    pub fn append(&mut self, transactions: impl IntoIterator<Item = Transaction>) {
        let appended: Vec<Transaction> = transactions.into_iter().collect();
        for tx in &appended {
            self.index(tx);
        }
        self.transactions.extend(appended);
        self.transactions.sort_by_key(|t| t.date);
    }

    fn index(&mut self, tx: &Transaction) {
        match &tx.kind {
            TransactionKind::Declare {
                ticker,
                id,
                currency,
            } => {
                keep_earliest(
                    &mut self.securities,
                    ticker,
                    tx.date,
                    Security {
                        id: id.clone(),
                        ticker: ticker.clone(),
                        currency: *currency,
                    },
                );
                self.currencies.insert(*currency);
            }
            TransactionKind::Buy { currency, .. }
            | TransactionKind::Sell { currency, .. }
            | TransactionKind::Dividend { currency, .. } => {
                if let Some(c) = currency {
                    self.currencies.insert(*c);
                }
            }
            TransactionKind::Deposit { currency, .. }
            | TransactionKind::Withdraw { currency, .. } => {
                self.currencies.insert(*currency);
            }
            TransactionKind::Convert {
                from_currency,
                to_currency,
                ..
            } => {
                self.currencies.insert(*from_currency);
                self.currencies.insert(*to_currency);
            }
            TransactionKind::Accrue {
                account, currency, ..
            } => {
                keep_earliest(&mut self.accounts, account, tx.date, *currency);
                self.currencies.insert(*currency);
            }
            TransactionKind::UpdatePrice { .. } => {}
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Date of the earliest transaction.
    pub fn inception(&self) -> Option<NaiveDate> {
        self.transactions.first().map(|t| t.date)
    }

    /// Transactions dated on or before `date`, in ledger order.
    pub fn up_to(&self, date: NaiveDate) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().take_while(move |t| t.date <= date)
    }

    pub fn securities(&self) -> impl Iterator<Item = &Security> {
        self.securities.values().map(|(_, s)| s)
    }

    pub fn security(&self, ticker: &str) -> Option<&Security> {
        self.securities.get(ticker).map(|(_, s)| s)
    }

    /// The security, if declared on or before `date`.
    pub fn security_as_of(&self, ticker: &str, date: NaiveDate) -> Option<&Security> {
        match self.securities.get(ticker) {
            Some((declared, security)) if *declared <= date => Some(security),
            _ => None,
        }
    }

    /// Counterparty accounts and their currencies.
    pub fn accounts(&self) -> impl Iterator<Item = (&str, Currency)> {
        self.accounts.iter().map(|(name, (_, c))| (name.as_str(), *c))
    }

    pub fn account_currency(&self, account: &str) -> Option<Currency> {
        self.accounts.get(account).map(|(_, c)| *c)
    }

    /// Currency of `account`, if it was opened on or before `date`.
    pub fn account_currency_as_of(&self, account: &str, date: NaiveDate) -> Option<Currency> {
        match self.accounts.get(account) {
            Some((opened, currency)) if *opened <= date => Some(*currency),
            _ => None,
        }
    }

    /// Every currency referenced by any transaction or declared security.
    pub fn currencies(&self) -> &BTreeSet<Currency> {
        &self.currencies
    }

    /// Currency of a security event: the explicit one, else the security's.
    pub fn trade_currency(&self, ticker: &str, explicit: Option<Currency>) -> Option<Currency> {
        explicit.or_else(|| self.security(ticker).map(|s| s.currency))
    }

    pub fn cash_balance(&self, currency: Currency, date: NaiveDate) -> Decimal {
        self.replay_cash(date)
            .cash
            .get(&currency)
            .copied()
            .unwrap_or_default()
    }

    pub fn counterparty_account_balance(&self, account: &str, date: NaiveDate) -> Decimal {
        self.replay_cash(date)
            .counterparties
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    fn replay_cash(&self, date: NaiveDate) -> CashState {
        let mut state = CashState::default();
        for tx in self.up_to(date) {
            match &tx.kind {
                TransactionKind::Buy {
                    ticker,
                    amount,
                    currency,
                    ..
                } => {
                    if let Some(c) = self.trade_currency(ticker, *currency) {
                        *state.cash.entry(c).or_default() -= *amount;
                    }
                }
                TransactionKind::Sell {
                    ticker,
                    amount,
                    currency,
                    ..
                }
                | TransactionKind::Dividend {
                    ticker,
                    amount,
                    currency,
                } => {
                    if let Some(c) = self.trade_currency(ticker, *currency) {
                        *state.cash.entry(c).or_default() += *amount;
                    }
                }
                TransactionKind::Deposit {
                    amount,
                    currency,
                    settles,
                } => {
                    *state.cash.entry(*currency).or_default() += *amount;
                    if let Some(account) = settles {
                        *state.counterparties.entry(account.clone()).or_default() -= *amount;
                    }
                }
                TransactionKind::Withdraw {
                    amount,
                    currency,
                    settles,
                } => {
                    let cash = state.cash.entry(*currency).or_default();
                    let amount = amount.unwrap_or(*cash);
                    *cash -= amount;
                    if let Some(account) = settles {
                        *state.counterparties.entry(account.clone()).or_default() += amount;
                    }
                }
                TransactionKind::Convert {
                    from_currency,
                    from_amount,
                    to_currency,
                    to_amount,
                } => {
                    let from = state.cash.entry(*from_currency).or_default();
                    *from -= from_amount.unwrap_or(*from);
                    *state.cash.entry(*to_currency).or_default() += *to_amount;
                }
                TransactionKind::Accrue {
                    account, amount, ..
                } => {
                    *state.counterparties.entry(account.clone()).or_default() += *amount;
                }
                TransactionKind::Declare { .. } | TransactionKind::UpdatePrice { .. } => {}
            }
        }
        state
    }

    /// Buys, sells, dividends and price updates of `ticker` up to `date`.
    pub fn security_transactions<'a>(
        &'a self,
        ticker: &'a str,
        date: NaiveDate,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.up_to(date).filter(move |t| t.ticker() == Some(ticker))
    }

    /// Shares of `ticker` held at `date`, each trade scaled by the splits
    /// effective after it and on or before `date`.
    pub fn position(&self, ticker: &str, date: NaiveDate, splits: &[Split]) -> Decimal {
        let mut position = Decimal::ZERO;
        for tx in self.security_transactions(ticker, date) {
            let factor = adjustment_factor(splits, tx.date, date);
            match &tx.kind {
                TransactionKind::Buy { quantity, .. } => position += *quantity * factor,
                TransactionKind::Sell {
                    quantity: Some(q), ..
                } => position -= *q * factor,
                TransactionKind::Sell { quantity: None, .. } => position = Decimal::ZERO,
                _ => {}
            }
        }
        position
    }
}
