//! The public engine APIs: the order synchronization service, the ledger entry lifecycle service, and the data
//! objects they exchange with callers.
pub mod entry_objects;
pub mod errors;
pub mod ledger_entry_api;
pub mod order_objects;
pub mod order_sync_api;
