//! Ledger persistence port trait.

use crate::domain::error::FolioError;
use crate::domain::ledger::Ledger;

/// Storage for a ledger. Loading is all-or-nothing: a record that fails to
/// decode aborts the load.
pub trait LedgerPort {
    fn load(&self) -> Result<Ledger, FolioError>;

    fn save(&self, ledger: &Ledger) -> Result<(), FolioError>;
}
