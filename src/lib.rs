//! folio: personal portfolio accounting.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. A [`domain::ledger::Ledger`] of
//! transactions is bound to market data in a [`domain::journal::Journal`],
//! which is replayed into point-in-time [`domain::balance::Balance`] snapshots.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
