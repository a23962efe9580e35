//! Port traits for the collaborators around the accounting core.

pub mod config_port;
pub mod ledger_port;
pub mod market_data_port;
