//! Ledger stored as JSON lines: one compact transaction object per line.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::error::FolioError;
use crate::domain::ledger::Ledger;
use crate::domain::transaction::Transaction;
use crate::ports::ledger_port::LedgerPort;

pub struct JsonlLedgerAdapter {
    path: PathBuf,
}

impl JsonlLedgerAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append transactions to the end of the file without rewriting it.
    pub fn append(&self, transactions: &[Transaction]) -> Result<(), FolioError> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for tx in transactions {
            writeln!(file, "{}", encode_line(tx)?)?;
        }
        Ok(())
    }
}

pub fn encode_line(tx: &Transaction) -> Result<String, FolioError> {
    serde_json::to_string(tx).map_err(|e| FolioError::Encode {
        reason: format!("{tx}: {e}"),
    })
}

pub fn decode_line(line: &str) -> Result<Transaction, serde_json::Error> {
    serde_json::from_str(line)
}

/// Decode a whole ledger. Blank lines are skipped; the first bad line aborts.
pub fn decode(content: &str, file: &str) -> Result<Ledger, FolioError> {
    let mut transactions = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let tx = decode_line(line).map_err(|e| FolioError::Decode {
            file: file.to_string(),
            line: index + 1,
            reason: e.to_string(),
        })?;
        transactions.push(tx);
    }
    Ok(Ledger::from_transactions(transactions))
}

pub fn encode(ledger: &Ledger) -> Result<String, FolioError> {
    let mut out = String::new();
    for tx in ledger.transactions() {
        out.push_str(&encode_line(tx)?);
        out.push('\n');
    }
    Ok(out)
}

impl LedgerPort for JsonlLedgerAdapter {
    fn load(&self) -> Result<Ledger, FolioError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "ledger file not found, starting empty");
                return Ok(Ledger::new());
            }
            Err(e) => return Err(e.into()),
        };
        let ledger = decode(&content, &self.path.display().to_string())?;
        tracing::info!(path = %self.path.display(), transactions = ledger.len(), "ledger loaded");
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), FolioError> {
        fs::write(&self.path, encode(ledger)?)?;
        tracing::info!(path = %self.path.display(), transactions = ledger.len(), "ledger saved");
        Ok(())
    }
}
