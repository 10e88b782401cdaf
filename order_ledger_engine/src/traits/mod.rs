//! # Database management and control.
//!
//! This module defines the interface contracts that database *backends* must implement to support the order-ledger
//! engine.
//!
//! * [`LedgerDatabase`] is the write-side contract. It owns transaction boundaries and the store-enforced uniqueness
//!   invariant that keeps orders and their ledger entries consistent under concurrent materialization.
//! * [`OrderManagement`], [`EntryManagement`] and [`UserManagement`] are the read-side contracts, all scoped through
//!   the access filter's owner id.
mod data_objects;
mod entry_management;
mod ledger_database;
mod order_management;
mod user_management;

pub use data_objects::{CancelOutcome, MaterializeResult, OrderSyncResult};
pub use entry_management::EntryManagement;
pub use ledger_database::{LedgerDatabase, LedgerStoreError};
pub use order_management::OrderManagement;
pub use user_management::UserManagement;
