//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_market_adapter::CsvMarketAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::jsonl_ledger_adapter::{JsonlLedgerAdapter, encode_line};
use crate::domain::balance::Balance;
use crate::domain::date::{Period, Range};
use crate::domain::error::FolioError;
use crate::domain::inventory::CostMethod;
use crate::domain::journal::Journal;
use crate::domain::money::{Currency, Money};
use crate::domain::report::{GainsReport, Performance, performance_by_period};
use crate::domain::transaction::Draft;
use crate::domain::validator::validate_against;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Personal portfolio accounting")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "folio.ini")]
    pub config: PathBuf,
    /// Reporting currency, overriding [report] currency
    #[arg(long, global = true)]
    pub currency: Option<String>,
    /// Cost basis method (fifo or average), overriding [report] method
    #[arg(long, global = true)]
    pub method: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show holdings, cash and totals at a date
    Balance {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Realized, unrealized and dividend gains over a period
    Gains {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Time-weighted return per period
    Performance {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value = "monthly")]
        period: Period,
    },
    /// Validate a transaction draft and append it to the ledger
    Add {
        #[arg(long)]
        json: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Load the ledger and market data and report problems
    Check,
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ledger_path: PathBuf,
    pub market_path: PathBuf,
    pub split_adjusted: bool,
    pub currency: Currency,
    pub method: CostMethod,
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<Settings, FolioError> {
    let ledger_path = config
        .get_path("ledger", "path")
        .ok_or_else(|| FolioError::ConfigMissing {
            section: "ledger".into(),
            key: "path".into(),
        })?;
    let market_path = config
        .get_path("market", "path")
        .ok_or_else(|| FolioError::ConfigMissing {
            section: "market".into(),
            key: "path".into(),
        })?;
    let split_adjusted = config.get_bool("market", "split_adjusted", false);

    let currency = match config.get_string("report", "currency") {
        Some(raw) => raw.parse().map_err(|e: FolioError| FolioError::ConfigInvalid {
            section: "report".into(),
            key: "currency".into(),
            reason: e.to_string(),
        })?,
        None => Currency::USD,
    };
    let method = match config.get_string("report", "method") {
        Some(raw) => raw.parse().map_err(|e: FolioError| FolioError::ConfigInvalid {
            section: "report".into(),
            key: "method".into(),
            reason: e.to_string(),
        })?,
        None => CostMethod::default(),
    };

    Ok(Settings {
        ledger_path,
        market_path,
        split_adjusted,
        currency,
        method,
    })
}

/// Apply `--currency` and `--method`.
pub fn apply_overrides(
    mut settings: Settings,
    currency: Option<&str>,
    method: Option<&str>,
) -> Result<Settings, FolioError> {
    if let Some(c) = currency {
        settings.currency = c.parse()?;
    }
    if let Some(m) = method {
        settings.method = m.parse()?;
    }
    Ok(settings)
}

pub fn run(cli: Cli) -> ExitCode {
    match dispatch(cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn dispatch(cli: Cli) -> Result<String, FolioError> {
    let adapter = FileConfigAdapter::from_file(&cli.config)?;
    let settings = apply_overrides(
        build_settings(&adapter)?,
        cli.currency.as_deref(),
        cli.method.as_deref(),
    )?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Command::Balance { date } => run_balance(&settings, date.unwrap_or(today)),
        Command::Gains { from, to } => run_gains(&settings, Range::new(from, to)?),
        Command::Performance { from, to, period } => {
            run_performance(&settings, Range::new(from, to)?, period)
        }
        Command::Add { json, dry_run } => run_add(&settings, &json, today, dry_run),
        Command::Check => run_check(&settings, today),
    }
}

fn ledger_adapter(settings: &Settings) -> JsonlLedgerAdapter {
    JsonlLedgerAdapter::new(settings.ledger_path.clone())
}

fn market_adapter(settings: &Settings) -> CsvMarketAdapter {
    CsvMarketAdapter::new(settings.market_path.clone()).with_split_adjusted(settings.split_adjusted)
}

pub fn load_journal(settings: &Settings) -> Result<Journal, FolioError> {
    let ledger = ledger_adapter(settings).load()?;
    Journal::new(ledger, settings.currency, &market_adapter(settings))
}

fn money(m: Money) -> String {
    format!("{:.2} {}", m.amount, m.currency)
}

pub fn run_balance(settings: &Settings, date: NaiveDate) -> Result<String, FolioError> {
    let journal = load_journal(settings)?;
    let balance = Balance::new(&journal, date, settings.method)?;
    Ok(render_balance(&balance))
}

pub fn render_balance(balance: &Balance) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Balance {} ({}, {}) ===",
        balance.date(),
        balance.reporting_currency(),
        balance.method()
    );

    let held: Vec<&str> = balance
        .securities()
        .filter(|t| !balance.position(t).is_zero())
        .collect();
    if !held.is_empty() {
        let _ = writeln!(out, "\nHoldings:");
        for ticker in held {
            let _ = writeln!(
                out,
                "  {:<8} {:>12}  value {:>16}  cost {:>16}  unrealized {:>16}",
                ticker,
                balance.position(ticker).normalize(),
                money(balance.market_value(ticker)),
                money(balance.cost_basis(ticker)),
                money(balance.unrealized_gain(ticker)),
            );
        }
    }

    let cash: Vec<Currency> = balance
        .currencies()
        .filter(|c| !balance.cash(*c).is_zero())
        .collect();
    if !cash.is_empty() {
        let _ = writeln!(out, "\nCash:");
        for currency in cash {
            let _ = writeln!(out, "  {}", money(balance.cash(currency)));
        }
    }

    let accounts: Vec<&str> = balance
        .counterparties()
        .filter(|a| !balance.counterparty(a).is_zero())
        .collect();
    if !accounts.is_empty() {
        let _ = writeln!(out, "\nCounterparties:");
        for account in accounts {
            let _ = writeln!(out, "  {:<16} {}", account, money(balance.counterparty(account)));
        }
    }

    let _ = writeln!(out, "\nMarket value:     {}", money(balance.total_market_value()));
    let _ = writeln!(out, "Cash:             {}", money(balance.total_cash()));
    let _ = writeln!(out, "Counterparties:   {}", money(balance.total_counterparty()));
    let _ = writeln!(out, "Total value:      {}", money(balance.total_portfolio_value()));
    let _ = writeln!(out, "Cost basis:       {}", money(balance.portfolio_cost_basis()));
    let _ = writeln!(out, "Unrealized gain:  {}", money(balance.total_unrealized_gain()));
    let _ = writeln!(out, "Linked TWR:       {:.4}", balance.linked_twr());
    out
}

pub fn run_gains(settings: &Settings, range: Range) -> Result<String, FolioError> {
    let journal = load_journal(settings)?;
    let before = range
        .from
        .pred_opt()
        .ok_or_else(|| FolioError::invalid("from", format!("{} is out of range", range.from)))?;
    let start = Balance::new(&journal, before, settings.method)?;
    let end = Balance::new(&journal, range.to, settings.method)?;
    let report = GainsReport::between(&start, &end)?;
    Ok(render_gains(&report))
}

pub fn render_gains(report: &GainsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Gains {} .. {} ===", report.from, report.to);
    for row in &report.rows {
        let _ = writeln!(
            out,
            "  {:<8} realized {:>16}  unrealized {:>16}  dividends {:>16}  total {:>16}",
            row.ticker,
            money(row.realized),
            money(row.unrealized_change),
            money(row.dividends),
            money(row.total()),
        );
    }
    let _ = writeln!(out, "\nRealized:    {}", money(report.realized));
    let _ = writeln!(out, "Unrealized:  {}", money(report.unrealized_change));
    let _ = writeln!(out, "Dividends:   {}", money(report.dividends));
    let _ = writeln!(out, "Total:       {}", money(report.total()));
    out
}

pub fn run_performance(
    settings: &Settings,
    range: Range,
    period: Period,
) -> Result<String, FolioError> {
    let journal = load_journal(settings)?;
    let periods = performance_by_period(&journal, range, period, settings.method)?;
    Ok(render_performance(&periods, period))
}

pub fn render_performance(periods: &[Performance], period: Period) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Performance ({period}) ===");
    for p in periods {
        let _ = writeln!(
            out,
            "  {} .. {}  twr {:>8.2}%  value {:>16}  flow {:>16}  gain {:>16}",
            p.from.succ_opt().unwrap_or(p.from),
            p.to,
            p.twr * rust_decimal::Decimal::ONE_HUNDRED,
            money(p.end_value),
            money(p.net_flow),
            money(p.gain()),
        );
    }
    out
}

/// Validate `json` as a draft against the ledger and append the result
/// unless `dry_run` is set. Returns the stored line.
pub fn run_add(
    settings: &Settings,
    json: &str,
    today: NaiveDate,
    dry_run: bool,
) -> Result<String, FolioError> {
    let draft: Draft = serde_json::from_str(json)
        .map_err(|e| FolioError::invalid("json", e.to_string()))?;
    let journal = load_journal(settings)?;
    let tx = validate_against(&journal, draft, today, settings.method)?;
    let line = encode_line(&tx)?;
    if dry_run {
        eprintln!("Dry run: not written");
    } else {
        ledger_adapter(settings).append(std::slice::from_ref(&tx))?;
        tracing::info!(%tx, "appended");
        eprintln!("Added: {tx}");
    }
    Ok(format!("{line}\n"))
}

pub fn run_check(settings: &Settings, today: NaiveDate) -> Result<String, FolioError> {
    let journal = load_journal(settings)?;
    let ledger = journal.ledger();
    let mut out = String::new();
    let _ = writeln!(out, "Transactions:  {}", ledger.len());
    let _ = writeln!(out, "Securities:    {}", ledger.securities().count());
    let _ = writeln!(out, "Accounts:      {}", ledger.accounts().count());
    let _ = writeln!(out, "Currencies:    {}", ledger.currencies().len());
    if let Some(first) = ledger.inception() {
        let _ = writeln!(out, "Inception:     {first}");
        Balance::new(&journal, today, settings.method)?;
    }
    let _ = writeln!(out, "OK");
    Ok(out)
}
