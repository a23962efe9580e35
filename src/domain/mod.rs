//! Core domain types and logic.

pub mod balance;
pub mod date;
pub mod error;
pub mod history;
pub mod inventory;
pub mod journal;
pub mod ledger;
pub mod money;
pub mod report;
pub mod security;
pub mod transaction;
pub mod validator;
