use ol_common::Money;
use thiserror::Error;

use crate::{
    db_types::{EntryStatus, LedgerEntry, NewEntry, NewOrder, NewUser, Order, User},
    order_objects::OrderUpdate,
    traits::{
        data_objects::{CancelOutcome, MaterializeResult, OrderSyncResult},
        EntryManagement,
        OrderManagement,
        UserManagement,
    },
};

/// This trait defines the write-side contract for backends supporting the order-ledger engine.
///
/// Every method that touches both the order and its ledger entry does so inside a single transaction: the two rows
/// are durable together or not at all. The only deliberate exception is the materialization race in
/// [`Self::update_order`], where a unique-constraint rejection forces a rollback that the implementation must repair
/// by replaying the order patch in a fresh transaction.
///
/// Implementations never perform input validation or permission checks; that is the service layer's job. They do own
/// the invariants that only the store can enforce, first among them the one-active-entry-per-order uniqueness that
/// makes idempotent materialization safe under concurrency.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + OrderManagement + EntryManagement + UserManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a new user. Fails with [`LedgerStoreError::DuplicateUser`] if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, LedgerStoreError>;

    /// Persists a new order and, when its total is positive, materializes the matching revenue entry, atomically.
    ///
    /// Returns the stored order together with the entry, if one was created.
    async fn create_order(&self, order: NewOrder) -> Result<(Order, Option<LedgerEntry>), LedgerStoreError>;

    /// Applies an [`OrderUpdate`] to the order identified by `order_id`, scoped to `owner` (`None` for unscoped,
    /// elevated access), and reconciles the order's ledger entry:
    ///
    /// * a settled entry blocks any total change ([`LedgerStoreError::EntrySettled`]),
    /// * a pending or cancelled entry follows the new total, reopening a cancelled entry when the total is positive,
    /// * a missing entry is materialized when the new total is positive,
    /// * a zero total cancels a pending entry, leaving its amount as a historical record.
    ///
    /// If the materialization insert loses a race against a concurrent request, the whole transaction is rolled back
    /// and repaired: the order is re-fetched, the patch is replayed in full, and the winner's entry takes the new
    /// amount. The race is never surfaced to the caller.
    async fn update_order(
        &self,
        order_id: i64,
        owner: Option<i64>,
        update: OrderUpdate,
    ) -> Result<OrderSyncResult, LedgerStoreError>;

    /// Soft-deletes the order, recording `deleted_by`, after cancelling its pending entry. A settled entry aborts
    /// the deletion with [`LedgerStoreError::EntrySettled`] and leaves both rows untouched.
    async fn delete_order(&self, order_id: i64, deleted_by: i64) -> Result<(Order, CancelOutcome), LedgerStoreError>;

    /// Clears the soft-delete marker. Fails with [`LedgerStoreError::OrderNotFound`] if the order does not exist or
    /// is not currently deleted.
    async fn restore_order(&self, order_id: i64) -> Result<Order, LedgerStoreError>;

    /// Persists a standalone ledger entry (no owning order), status `Pending`.
    async fn insert_entry(&self, entry: NewEntry) -> Result<LedgerEntry, LedgerStoreError>;

    /// Idempotently materializes the revenue entry for an order.
    ///
    /// If an active entry already references the order it is returned unchanged. Otherwise a `Pending` revenue entry
    /// is inserted; if the insert is rejected by the uniqueness invariant because a concurrent request won, the
    /// winner's row is re-read and returned as if this call had created it.
    async fn materialize_entry(
        &self,
        order_id: i64,
        owner: i64,
        amount: Money,
        description: &str,
    ) -> Result<MaterializeResult, LedgerStoreError>;

    /// Writes a new status for the entry and bumps its update timestamp. Transition legality is the service layer's
    /// concern; the store only refuses entries that do not exist.
    async fn update_entry_status(&self, entry_id: i64, status: EntryStatus) -> Result<LedgerEntry, LedgerStoreError>;

    /// Cancels the active entry for an order, if any. A `Pending` entry becomes `Cancelled`; an already cancelled
    /// entry and a missing entry are both reported as success. A settled entry fails with
    /// [`LedgerStoreError::EntrySettled`] so that the caller can block the operation that triggered the cancellation.
    async fn cancel_entry_for_order(&self, order_id: i64) -> Result<CancelOutcome, LedgerStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerStoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Ledger entry {0} does not exist")]
    EntryNotFound(i64),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("A user named '{0}' already exists")]
    DuplicateUser(String),
    #[error("Order {0} already has an active ledger entry")]
    DuplicateEntryForOrder(i64),
    #[error("The ledger entry for order {0} is already settled")]
    EntrySettled(i64),
}

impl From<sqlx::Error> for LedgerStoreError {
    fn from(e: sqlx::Error) -> Self {
        LedgerStoreError::DatabaseError(e.to_string())
    }
}
