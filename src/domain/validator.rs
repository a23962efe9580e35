//! Check a draft against the portfolio state and fill in defaulted fields.
//!
//! The result is either a complete [`Transaction`] ready to append or an
//! error; the journal is never touched.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::balance::Balance;
use super::error::FolioError;
use super::inventory::CostMethod;
use super::journal::Journal;
use super::money::Currency;
use super::security::Security;
use super::transaction::{Draft, Transaction, TransactionKind};

/// Validate `draft` against the positions and cash held the day before its
/// date. Market data is not consulted.
///
/// A draft without a date is dated `today`.
pub fn validate_against(
    journal: &Journal,
    draft: Draft,
    today: NaiveDate,
    method: CostMethod,
) -> Result<Transaction, FolioError> {
    let date = draft.date.unwrap_or(today);
    let previous = date
        .pred_opt()
        .ok_or_else(|| FolioError::invalid("date", format!("{date} is out of range")))?;
    let balance = Balance::unvalued(journal, previous, method)?;
    validate(journal, &balance, Draft::new(Some(date), draft.kind), today)
}

/// Validate `draft` against an already computed `balance`.
pub fn validate(
    journal: &Journal,
    balance: &Balance,
    draft: Draft,
    today: NaiveDate,
) -> Result<Transaction, FolioError> {
    let date = draft.date.unwrap_or(today);
    let kind = resolve(journal, balance, date, draft.kind)?;
    let tx = Transaction::new(date, kind);
    tracing::debug!(%tx, "validated");
    Ok(tx)
}

fn resolve(
    journal: &Journal,
    balance: &Balance,
    date: NaiveDate,
    kind: TransactionKind,
) -> Result<TransactionKind, FolioError> {
    let ledger = journal.ledger();
    match kind {
        TransactionKind::Declare {
            ticker,
            id,
            currency,
        } => {
            if ticker.trim().is_empty() {
                return Err(FolioError::invalid("ticker", "must not be empty"));
            }
            if id.trim().is_empty() {
                return Err(FolioError::invalid("id", "must not be empty"));
            }
            if let Some(existing) = ledger.security(&ticker) {
                if existing.id != id || existing.currency != currency {
                    return Err(FolioError::invalid(
                        "ticker",
                        format!(
                            "{ticker} already declared as {} in {}",
                            existing.id, existing.currency
                        ),
                    ));
                }
            }
            Ok(TransactionKind::Declare {
                ticker,
                id,
                currency,
            })
        }
        TransactionKind::Buy {
            ticker,
            quantity,
            amount,
            currency,
        } => {
            let security = declared(journal, &ticker, date)?;
            let currency = trade_currency(security, currency)?;
            positive("quantity", quantity)?;
            if amount < Decimal::ZERO {
                return Err(FolioError::invalid("amount", "must not be negative"));
            }
            require_cash(balance, currency, amount)?;
            Ok(TransactionKind::Buy {
                ticker,
                quantity,
                amount,
                currency: Some(currency),
            })
        }
        TransactionKind::Sell {
            ticker,
            quantity,
            amount,
            currency,
        } => {
            let security = declared(journal, &ticker, date)?;
            let currency = trade_currency(security, currency)?;
            if amount < Decimal::ZERO {
                return Err(FolioError::invalid("amount", "must not be negative"));
            }
            let held = balance.position(&ticker);
            let quantity = match quantity {
                Some(q) => {
                    positive("quantity", q)?;
                    q
                }
                None => held,
            };
            if quantity > held || held <= Decimal::ZERO {
                return Err(FolioError::InsufficientPosition {
                    ticker,
                    available: held,
                    required: quantity,
                });
            }
            Ok(TransactionKind::Sell {
                ticker,
                quantity: Some(quantity),
                amount,
                currency: Some(currency),
            })
        }
        TransactionKind::Dividend {
            ticker,
            amount,
            currency,
        } => {
            let security = declared(journal, &ticker, date)?;
            let currency = trade_currency(security, currency)?;
            if amount.is_zero() {
                return Err(FolioError::invalid("amount", "must not be zero"));
            }
            Ok(TransactionKind::Dividend {
                ticker,
                amount,
                currency: Some(currency),
            })
        }
        TransactionKind::Deposit {
            amount,
            currency,
            settles,
        } => {
            positive("amount", amount)?;
            if let Some(account) = &settles {
                settling_account(journal, account, currency, date)?;
            }
            Ok(TransactionKind::Deposit {
                amount,
                currency,
                settles,
            })
        }
        TransactionKind::Withdraw {
            amount,
            currency,
            settles,
        } => {
            if let Some(account) = &settles {
                settling_account(journal, account, currency, date)?;
            }
            let amount = match amount {
                Some(a) => {
                    positive("amount", a)?;
                    a
                }
                None => everything(balance, currency)?,
            };
            require_cash(balance, currency, amount)?;
            Ok(TransactionKind::Withdraw {
                amount: Some(amount),
                currency,
                settles,
            })
        }
        TransactionKind::Convert {
            from_currency,
            from_amount,
            to_currency,
            to_amount,
        } => {
            if from_currency == to_currency {
                return Err(FolioError::invalid(
                    "to_currency",
                    format!("cannot convert {from_currency} into itself"),
                ));
            }
            positive("to_amount", to_amount)?;
            let from_amount = match from_amount {
                Some(a) => {
                    positive("from_amount", a)?;
                    a
                }
                None => everything(balance, from_currency)?,
            };
            require_cash(balance, from_currency, from_amount)?;
            Ok(TransactionKind::Convert {
                from_currency,
                from_amount: Some(from_amount),
                to_currency,
                to_amount,
            })
        }
        TransactionKind::Accrue {
            account,
            amount,
            currency,
            create,
        } => {
            if account.trim().is_empty() {
                return Err(FolioError::invalid("account", "must not be empty"));
            }
            if amount.is_zero() {
                return Err(FolioError::invalid("amount", "must not be zero"));
            }
            if let Some(existing) = ledger.account_currency(&account) {
                if existing != currency {
                    return Err(FolioError::invalid(
                        "currency",
                        format!("account {account} is held in {existing}, not {currency}"),
                    ));
                }
            }
            if !create && ledger.account_currency_as_of(&account, date).is_none() {
                return Err(FolioError::UnknownAccount { account });
            }
            Ok(TransactionKind::Accrue {
                account,
                amount,
                currency,
                create,
            })
        }
        TransactionKind::UpdatePrice { ticker, price } => {
            declared(journal, &ticker, date)?;
            positive("price", price)?;
            Ok(TransactionKind::UpdatePrice { ticker, price })
        }
    }
}

/// A draft is appended after every transaction of its date, so a
/// declaration on the same date counts.
fn declared<'j>(
    journal: &'j Journal,
    ticker: &str,
    date: NaiveDate,
) -> Result<&'j Security, FolioError> {
    journal
        .ledger()
        .security_as_of(ticker, date)
        .ok_or_else(|| FolioError::UnknownSecurity {
            ticker: ticker.to_string(),
        })
}

/// Securities trade only in their declared currency.
fn trade_currency(security: &Security, explicit: Option<Currency>) -> Result<Currency, FolioError> {
    match explicit {
        Some(c) if c != security.currency => Err(FolioError::invalid(
            "currency",
            format!("{} trades in {}, not {c}", security.ticker, security.currency),
        )),
        _ => Ok(security.currency),
    }
}

fn positive(field: &str, value: Decimal) -> Result<(), FolioError> {
    if value <= Decimal::ZERO {
        return Err(FolioError::invalid(field, format!("must be positive, got {value}")));
    }
    Ok(())
}

fn require_cash(balance: &Balance, currency: Currency, required: Decimal) -> Result<(), FolioError> {
    let available = balance.cash(currency).amount;
    if required > available {
        return Err(FolioError::InsufficientFunds {
            currency,
            available,
            required,
        });
    }
    Ok(())
}

/// The whole cash balance in `currency`; nothing to move is an error.
fn everything(balance: &Balance, currency: Currency) -> Result<Decimal, FolioError> {
    let available = balance.cash(currency).amount;
    if available <= Decimal::ZERO {
        return Err(FolioError::InsufficientFunds {
            currency,
            available,
            required: Decimal::ZERO,
        });
    }
    Ok(available)
}

fn settling_account(
    journal: &Journal,
    account: &str,
    currency: Currency,
    date: NaiveDate,
) -> Result<(), FolioError> {
    match journal.ledger().account_currency_as_of(account, date) {
        None => Err(FolioError::UnknownAccount {
            account: account.to_string(),
        }),
        Some(held) if held != currency => Err(FolioError::invalid(
            "currency",
            format!("account {account} is held in {held}, not {currency}"),
        )),
        Some(_) => Ok(()),
    }
}
