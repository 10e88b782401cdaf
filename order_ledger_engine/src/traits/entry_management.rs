use crate::{db_types::LedgerEntry, entry_objects::EntryQueryFilter, traits::LedgerStoreError};

/// Read-side queries over ledger entries. Scoping follows the same rules as
/// [`OrderManagement`](crate::traits::OrderManagement).
#[allow(async_fn_in_trait)]
pub trait EntryManagement: Clone {
    /// Fetches a non-deleted entry by id, without tenant scoping.
    async fn entry_by_id(&self, entry_id: i64) -> Result<Option<LedgerEntry>, LedgerStoreError>;

    /// Fetches a non-deleted entry by id, visible to the given owner scope.
    async fn entry_for_owner(&self, entry_id: i64, owner: Option<i64>) -> Result<Option<LedgerEntry>, LedgerStoreError>;

    /// Fetches the active (non-deleted) entry referencing the given order. The store's uniqueness invariant
    /// guarantees at most one such row.
    async fn entry_for_order(&self, order_id: i64) -> Result<Option<LedgerEntry>, LedgerStoreError>;

    /// Fetches entries matching the filter, most recently occurred first.
    async fn search_entries(&self, query: EntryQueryFilter) -> Result<Vec<LedgerEntry>, LedgerStoreError>;
}
