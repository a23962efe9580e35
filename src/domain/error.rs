//! Domain error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::money::Currency;

/// Top-level error type for folio.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("unknown security {ticker}")]
    UnknownSecurity { ticker: String },

    #[error("unknown counterparty account {account}")]
    UnknownAccount { account: String },

    #[error("no exchange rate for {currency}{}", fmt_on(.date))]
    MissingRate {
        currency: Currency,
        date: Option<NaiveDate>,
    },

    #[error("no price for {ticker} on or before {date}")]
    MissingPrice { ticker: String, date: NaiveDate },

    #[error("no market data series {id}")]
    MissingSeries { id: String },

    #[error("insufficient {currency} cash: have {available}, need {required}")]
    InsufficientFunds {
        currency: Currency,
        available: Decimal,
        required: Decimal,
    },

    #[error("insufficient {ticker} position: have {available}, need {required}")]
    InsufficientPosition {
        ticker: String,
        available: Decimal,
        required: Decimal,
    },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("{file}:{line}: {reason}")]
    Decode {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("encode error: {reason}")]
    Encode { reason: String },

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn fmt_on(date: &Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!(" on or before {d}"),
        None => String::new(),
    }
}

impl FolioError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FolioError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            FolioError::Io(_) => 1,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. } => 2,
            FolioError::Decode { .. }
            | FolioError::Encode { .. }
            | FolioError::MarketData { .. } => 3,
            FolioError::UnknownSecurity { .. }
            | FolioError::UnknownAccount { .. }
            | FolioError::InsufficientFunds { .. }
            | FolioError::InsufficientPosition { .. }
            | FolioError::InvalidField { .. } => 4,
            FolioError::MissingRate { .. }
            | FolioError::MissingPrice { .. }
            | FolioError::MissingSeries { .. } => 5,
        }
    }
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
