use crate::{db_types::Order, order_objects::OrderQueryFilter, traits::LedgerStoreError};

/// Read-side queries over orders.
///
/// The scoped variants take an optional owner id produced by the access filter: `Some(owner)` restricts visibility
/// to that owner's rows, `None` is the elevated, unscoped view. A row hidden by the scope and a row that does not
/// exist are both reported as `None` so that callers cannot probe for existence.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Fetches a non-deleted order by id, without tenant scoping.
    async fn order_by_id(&self, order_id: i64) -> Result<Option<Order>, LedgerStoreError>;

    /// Fetches a non-deleted order by id, visible to the given owner scope.
    async fn order_for_owner(&self, order_id: i64, owner: Option<i64>) -> Result<Option<Order>, LedgerStoreError>;

    /// Fetches an order by id regardless of its soft-delete state.
    async fn order_by_id_with_deleted(&self, order_id: i64) -> Result<Option<Order>, LedgerStoreError>;

    /// Fetches orders matching the filter, most recent first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerStoreError>;
}
