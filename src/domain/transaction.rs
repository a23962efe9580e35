//! Ledger events.
//!
//! Every event is a [`Transaction`]: a date plus one [`TransactionKind`].
//! Fields that may be filled in by the validator are `Option`s; `None`
//! asks for the default (sell all, withdraw all, convert all, the security's
//! currency), which is distinct from a literal zero.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Currency;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Introduces a tradable security.
    Declare {
        ticker: String,
        id: String,
        currency: Currency,
    },
    Buy {
        ticker: String,
        quantity: Decimal,
        amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<Currency>,
    },
    Sell {
        ticker: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<Decimal>,
        amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<Currency>,
    },
    Dividend {
        ticker: String,
        amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<Currency>,
    },
    Deposit {
        amount: Decimal,
        currency: Currency,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settles: Option<String>,
    },
    Withdraw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Decimal>,
        currency: Currency,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settles: Option<String>,
    },
    /// Atomic currency exchange.
    Convert {
        from_currency: Currency,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_amount: Option<Decimal>,
        to_currency: Currency,
        to_amount: Decimal,
    },
    /// Money owed to (positive) or by (negative) a counterparty.
    Accrue {
        account: String,
        amount: Decimal,
        currency: Currency,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        create: bool,
    },
    /// A market price observation; does not change holdings.
    UpdatePrice { ticker: String, price: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn new(date: NaiveDate, kind: TransactionKind) -> Self {
        Transaction { date, kind }
    }

    pub fn when(&self) -> NaiveDate {
        self.date
    }

    /// Human readable one-line description.
    pub fn what(&self) -> String {
        self.kind.to_string()
    }

    /// Ticker referenced by security events.
    pub fn ticker(&self) -> Option<&str> {
        match &self.kind {
            TransactionKind::Declare { ticker, .. }
            | TransactionKind::Buy { ticker, .. }
            | TransactionKind::Sell { ticker, .. }
            | TransactionKind::Dividend { ticker, .. }
            | TransactionKind::UpdatePrice { ticker, .. } => Some(ticker),
            TransactionKind::Deposit { .. }
            | TransactionKind::Withdraw { .. }
            | TransactionKind::Convert { .. }
            | TransactionKind::Accrue { .. } => None,
        }
    }

    /// Deposits and withdrawals that move money across the portfolio boundary.
    /// Settling a counterparty account is an internal transfer.
    pub fn is_external_flow(&self) -> bool {
        matches!(
            &self.kind,
            TransactionKind::Deposit { settles: None, .. }
                | TransactionKind::Withdraw { settles: None, .. }
        )
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.kind)
    }
}

fn opt_ccy(currency: &Option<Currency>) -> String {
    currency.map(|c| format!(" {c}")).unwrap_or_default()
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Declare {
                ticker,
                id,
                currency,
            } => write!(f, "declare {ticker} ({id}) in {currency}"),
            TransactionKind::Buy {
                ticker,
                quantity,
                amount,
                currency,
            } => write!(f, "buy {quantity} {ticker} for {amount}{}", opt_ccy(currency)),
            TransactionKind::Sell {
                ticker,
                quantity,
                amount,
                currency,
            } => match quantity {
                Some(q) => write!(f, "sell {q} {ticker} for {amount}{}", opt_ccy(currency)),
                None => write!(f, "sell all {ticker} for {amount}{}", opt_ccy(currency)),
            },
            TransactionKind::Dividend {
                ticker,
                amount,
                currency,
            } => write!(f, "dividend {amount}{} from {ticker}", opt_ccy(currency)),
            TransactionKind::Deposit {
                amount,
                currency,
                settles,
            } => {
                write!(f, "deposit {amount} {currency}")?;
                if let Some(account) = settles {
                    write!(f, " settling {account}")?;
                }
                Ok(())
            }
            TransactionKind::Withdraw {
                amount,
                currency,
                settles,
            } => {
                match amount {
                    Some(a) => write!(f, "withdraw {a} {currency}")?,
                    None => write!(f, "withdraw all {currency}")?,
                }
                if let Some(account) = settles {
                    write!(f, " settling {account}")?;
                }
                Ok(())
            }
            TransactionKind::Convert {
                from_currency,
                from_amount,
                to_currency,
                to_amount,
            } => match from_amount {
                Some(a) => write!(
                    f,
                    "convert {a} {from_currency} to {to_amount} {to_currency}"
                ),
                None => write!(f, "convert all {from_currency} to {to_amount} {to_currency}"),
            },
            TransactionKind::Accrue {
                account,
                amount,
                currency,
                create,
            } => {
                write!(f, "accrue {amount} {currency} on {account}")?;
                if *create {
                    write!(f, " (new account)")?;
                }
                Ok(())
            }
            TransactionKind::UpdatePrice { ticker, price } => {
                write!(f, "price {ticker} at {price}")
            }
        }
    }
}

/// A transaction awaiting validation; a missing date means today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub kind: TransactionKind,
}

impl Draft {
    pub fn new(date: Option<NaiveDate>, kind: TransactionKind) -> Self {
        Draft { date, kind }
    }
}

impl From<Transaction> for Draft {
    fn from(tx: Transaction) -> Self {
        Draft {
            date: Some(tx.date),
            kind: tx.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn usd() -> Currency {
        "USD".parse().unwrap()
    }

    #[test]
    fn buy_serializes_with_date_and_tag_first() {
        let tx = Transaction::new(
            d(2024, 1, 2),
            TransactionKind::Buy {
                ticker: "AAPL".into(),
                quantity: dec!(10),
                amount: dec!(1500.00),
                currency: Some(usd()),
            },
        );
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2024-01-02","type":"buy","ticker":"AAPL","quantity":"10","amount":"1500.00","currency":"USD"}"#
        );
    }

    #[test]
    fn optional_fields_are_omitted() {
        let tx = Transaction::new(
            d(2024, 1, 2),
            TransactionKind::Withdraw {
                amount: None,
                currency: usd(),
                settles: None,
            },
        );
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(json, r#"{"date":"2024-01-02","type":"withdraw","currency":"USD"}"#);
    }

    #[test]
    fn decodes_numbers_and_strings_for_amounts() {
        let tx: Transaction = serde_json::from_str(
            r#"{"date":"2024-02-01","type":"deposit","amount":250.5,"currency":"USD"}"#,
        )
        .unwrap();
        assert_eq!(
            tx.kind,
            TransactionKind::Deposit {
                amount: dec!(250.5),
                currency: usd(),
                settles: None,
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = serde_json::from_str::<Transaction>(
            r#"{"date":"2024-02-01","type":"gift","amount":"1"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn what_describes_the_event() {
        let tx = Transaction::new(
            d(2024, 1, 2),
            TransactionKind::Sell {
                ticker: "AAPL".into(),
                quantity: None,
                amount: dec!(900),
                currency: None,
            },
        );
        assert_eq!(tx.what(), "sell all AAPL for 900");
        assert_eq!(tx.when(), d(2024, 1, 2));
        assert_eq!(tx.ticker(), Some("AAPL"));
        assert_eq!(tx.to_string(), "2024-01-02 sell all AAPL for 900");
    }

    #[test]
    fn settled_deposit_is_not_external() {
        let external = Transaction::new(
            d(2024, 1, 2),
            TransactionKind::Deposit {
                amount: dec!(1),
                currency: usd(),
                settles: None,
            },
        );
        let settled = Transaction::new(
            d(2024, 1, 2),
            TransactionKind::Deposit {
                amount: dec!(1),
                currency: usd(),
                settles: Some("employer".into()),
            },
        );
        assert!(external.is_external_flow());
        assert!(!settled.is_external_flow());
    }

    #[test]
    fn draft_date_is_optional() {
        let draft: Draft =
            serde_json::from_str(r#"{"type":"sell","ticker":"AAPL","amount":"100"}"#).unwrap();
        assert_eq!(draft.date, None);
        assert!(matches!(draft.kind, TransactionKind::Sell { quantity: None, .. }));
    }
}
