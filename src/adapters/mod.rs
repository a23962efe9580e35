//! Concrete adapter implementations for ports.

pub mod csv_market_adapter;
pub mod file_config_adapter;
pub mod jsonl_ledger_adapter;
pub mod memory_market_adapter;
