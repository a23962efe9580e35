#![allow(dead_code)]

use chrono::NaiveDate;
use folio::adapters::memory_market_adapter::MemoryMarketData;
use folio::domain::journal::Journal;
use folio::domain::ledger::Ledger;
use folio::domain::money::Currency;
use folio::domain::transaction::{Transaction, TransactionKind};
use rust_decimal::Decimal;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ccy(code: &str) -> Currency {
    code.parse().unwrap()
}

pub fn declare(on: NaiveDate, ticker: &str, id: &str, currency: &str) -> Transaction {
    Transaction::new(
        on,
        TransactionKind::Declare {
            ticker: ticker.into(),
            id: id.into(),
            currency: ccy(currency),
        },
    )
}

pub fn deposit(on: NaiveDate, amount: Decimal, currency: &str) -> Transaction {
    Transaction::new(
        on,
        TransactionKind::Deposit {
            amount,
            currency: ccy(currency),
            settles: None,
        },
    )
}

pub fn withdraw(on: NaiveDate, amount: Option<Decimal>, currency: &str) -> Transaction {
    Transaction::new(
        on,
        TransactionKind::Withdraw {
            amount,
            currency: ccy(currency),
            settles: None,
        },
    )
}

pub fn buy(on: NaiveDate, ticker: &str, quantity: Decimal, amount: Decimal) -> Transaction {
    Transaction::new(
        on,
        TransactionKind::Buy {
            ticker: ticker.into(),
            quantity,
            amount,
            currency: None,
        },
    )
}

pub fn sell(on: NaiveDate, ticker: &str, quantity: Option<Decimal>, amount: Decimal) -> Transaction {
    Transaction::new(
        on,
        TransactionKind::Sell {
            ticker: ticker.into(),
            quantity,
            amount,
            currency: None,
        },
    )
}

pub fn dividend(on: NaiveDate, ticker: &str, amount: Decimal) -> Transaction {
    Transaction::new(
        on,
        TransactionKind::Dividend {
            ticker: ticker.into(),
            amount,
            currency: None,
        },
    )
}

pub fn journal(
    transactions: impl IntoIterator<Item = Transaction>,
    reporting: &str,
    market: &MemoryMarketData,
) -> Journal {
    Journal::new(Ledger::from_transactions(transactions), ccy(reporting), market).unwrap()
}
