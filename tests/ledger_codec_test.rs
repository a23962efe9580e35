//! JSON-lines ledger encoding.

mod common;

use common::*;
use folio::adapters::jsonl_ledger_adapter::{decode, encode};
use folio::domain::ledger::Ledger;
use folio::domain::money::Currency;
use folio::domain::transaction::{Transaction, TransactionKind};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop::sample::select(vec!["USD", "EUR", "GBP", "JPY", "CHF"]).prop_map(ccy)
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000_000i64..1_000_000_000, 0u32..6).prop_map(|(n, scale)| Decimal::new(n, scale))
}

fn positive_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000, 0u32..6).prop_map(|(n, scale)| Decimal::new(n, scale))
}

fn ticker_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{1,5}"
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        (ticker_strategy(), "[A-Z0-9]{12}", currency_strategy()).prop_map(
            |(ticker, id, currency)| TransactionKind::Declare { ticker, id, currency }
        ),
        (
            ticker_strategy(),
            positive_strategy(),
            positive_strategy(),
            prop::option::of(currency_strategy())
        )
            .prop_map(|(ticker, quantity, amount, currency)| TransactionKind::Buy {
                ticker,
                quantity,
                amount,
                currency,
            }),
        (
            ticker_strategy(),
            prop::option::of(positive_strategy()),
            positive_strategy(),
            prop::option::of(currency_strategy())
        )
            .prop_map(|(ticker, quantity, amount, currency)| TransactionKind::Sell {
                ticker,
                quantity,
                amount,
                currency,
            }),
        (ticker_strategy(), amount_strategy(), prop::option::of(currency_strategy())).prop_map(
            |(ticker, amount, currency)| TransactionKind::Dividend {
                ticker,
                amount,
                currency,
            }
        ),
        (
            positive_strategy(),
            currency_strategy(),
            prop::option::of("[a-z]{3,10}")
        )
            .prop_map(|(amount, currency, settles)| TransactionKind::Deposit {
                amount,
                currency,
                settles,
            }),
        (
            prop::option::of(positive_strategy()),
            currency_strategy(),
            prop::option::of("[a-z]{3,10}")
        )
            .prop_map(|(amount, currency, settles)| TransactionKind::Withdraw {
                amount,
                currency,
                settles,
            }),
        (
            currency_strategy(),
            prop::option::of(positive_strategy()),
            currency_strategy(),
            positive_strategy()
        )
            .prop_map(|(from_currency, from_amount, to_currency, to_amount)| {
                TransactionKind::Convert {
                    from_currency,
                    from_amount,
                    to_currency,
                    to_amount,
                }
            }),
        ("[a-z]{3,10}", amount_strategy(), currency_strategy(), any::<bool>()).prop_map(
            |(account, amount, currency, create)| TransactionKind::Accrue {
                account,
                amount,
                currency,
                create,
            }
        ),
        (ticker_strategy(), positive_strategy())
            .prop_map(|(ticker, price)| TransactionKind::UpdatePrice { ticker, price }),
    ]
}

fn transaction_strategy() -> impl Strategy<Value = Transaction> {
    (0u64..3650, kind_strategy()).prop_map(|(offset, kind)| {
        Transaction::new(date(2015, 1, 1) + chrono::Days::new(offset), kind)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decode_encode_is_byte_stable(
        transactions in prop::collection::vec(transaction_strategy(), 0..30),
    ) {
        let ledger = Ledger::from_transactions(transactions);
        let text = encode(&ledger).unwrap();
        let decoded = decode(&text, "ledger.jsonl").unwrap();
        prop_assert_eq!(decoded.transactions(), ledger.transactions());
        prop_assert_eq!(encode(&decoded).unwrap(), text);
    }

    #[test]
    fn encoded_ledger_is_date_ordered(
        transactions in prop::collection::vec(transaction_strategy(), 0..30),
    ) {
        let ledger = Ledger::from_transactions(transactions);
        let decoded = decode(&encode(&ledger).unwrap(), "ledger.jsonl").unwrap();
        let dates: Vec<_> = decoded.transactions().iter().map(|t| t.date).collect();
        prop_assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn hand_written_ledger_round_trips() {
    let text = concat!(
        r#"{"date":"2024-01-01","type":"accrue","account":"employer","amount":"3000","currency":"EUR","create":true}"#,
        "\n",
        r#"{"date":"2024-01-05","type":"deposit","amount":"2000.50","currency":"EUR","settles":"employer"}"#,
        "\n",
        r#"{"date":"2024-01-06","type":"convert","from_currency":"EUR","to_currency":"USD","to_amount":"2150"}"#,
        "\n",
        r#"{"date":"2024-01-07","type":"update_price","ticker":"AAPL","price":"185.64"}"#,
        "\n",
    );
    let ledger = decode(text, "ledger.jsonl").unwrap();
    assert_eq!(ledger.len(), 4);
    assert_eq!(ledger.account_currency("employer"), Some(ccy("EUR")));
    assert_eq!(encode(&ledger).unwrap(), text);
}
