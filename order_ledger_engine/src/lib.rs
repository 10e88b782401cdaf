//! Order Ledger Engine
//!
//! The engine keeps a multi-tenant order book and its derived financial ledger consistent: every order with a
//! positive total owns exactly one active revenue entry, and the two are kept in lockstep under concurrent creation,
//! partial updates, soft-deletion and restoration.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@traits`] defines the contracts, the `sqlite` module implements them).
//!    You should never need to access the database directly. Instead, use the public API provided by the engine. The
//!    exception is the data types used in the database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`OrderSyncApi`] and [`LedgerEntryApi`]). These provide the public-facing
//!    functionality: order creation/update/deletion with automatic ledger reconciliation, and the entry lifecycle
//!    state machine. Specific backends need to implement the traits in [`mod@traits`] to act as a store for these
//!    services.
//!
//! Consistency between the two tables does not rely on locks. The store enforces a uniqueness invariant (one active
//! entry per order) and the engine recovers from losing a concurrent materialization race by re-reading the winner's
//! row, so materialization is idempotent no matter how calls interleave.
pub mod access;
pub mod db_types;
mod ole_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use ole_api::{
    entry_objects,
    errors::LedgerApiError,
    ledger_entry_api::LedgerEntryApi,
    order_objects,
    order_sync_api::OrderSyncApi,
};
pub use traits::{
    CancelOutcome,
    EntryManagement,
    LedgerDatabase,
    LedgerStoreError,
    MaterializeResult,
    OrderManagement,
    OrderSyncResult,
    UserManagement,
};
