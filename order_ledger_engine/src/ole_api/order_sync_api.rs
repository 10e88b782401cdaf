use std::fmt::Debug;

use log::*;
use ol_common::Money;

use crate::{
    access::Requester,
    db_types::{LedgerEntry, NewOrder, NewUser, Order, User},
    ole_api::errors::LedgerApiError,
    order_objects::{OrderChanged, OrderQueryFilter, OrderUpdate},
    traits::{CancelOutcome, LedgerDatabase, OrderSyncResult},
};

/// `OrderSyncApi` is the order synchronization service: it owns order creation, partial update, soft-deletion and
/// restoration, and drives the ledger entry lifecycle so that the two entities never disagree.
///
/// The service validates inputs and enforces access rules; the backend owns atomicity and the uniqueness invariant.
/// Every mutating call returns the before/after state the transport layer needs for audit recording.
pub struct OrderSyncApi<B> {
    db: B,
}

impl<B> Debug for OrderSyncApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderSyncApi")
    }
}

impl<B> OrderSyncApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderSyncApi<B>
where B: LedgerDatabase
{
    /// Registers a new user. The engine holds no credentials; this only anchors ownership.
    pub async fn create_user(&self, user: NewUser) -> Result<User, LedgerApiError> {
        if user.username.trim().is_empty() {
            return Err(LedgerApiError::Validation("username must not be blank".to_string()));
        }
        Ok(self.db.create_user(user).await?)
    }

    /// Creates an order owned by the requester.
    ///
    /// When the total is positive, the matching `Pending` revenue entry is materialized in the same transaction, so
    /// the pair is durable together or not at all.
    pub async fn create_order(
        &self,
        requester: &Requester,
        description: &str,
        total: Money,
    ) -> Result<(Order, Option<LedgerEntry>), LedgerApiError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerApiError::Validation("description must not be blank".to_string()));
        }
        if total.is_negative() {
            return Err(LedgerApiError::Validation(format!("total must not be negative (got {total})")));
        }
        let order = NewOrder::new(requester.user_id, description, total);
        let (order, entry) = self.db.create_order(order).await?;
        debug!(
            "🔄️📦️ Order #{} created for user {} with total {}{}",
            order.id,
            order.user_id,
            order.total,
            entry.as_ref().map(|e| format!(", entry {} materialized", e.id)).unwrap_or_default()
        );
        Ok((order, entry))
    }

    /// Fetches an order visible to the requester. Hidden and missing orders are indistinguishable.
    pub async fn fetch_order(&self, requester: &Requester, order_id: i64) -> Result<Order, LedgerApiError> {
        self.db
            .order_for_owner(order_id, requester.owner_filter())
            .await?
            .ok_or(LedgerApiError::NotFound("Order"))
    }

    /// Fetches orders matching the filter. Non-elevated requesters are confined to their own, non-deleted orders.
    pub async fn search_orders(
        &self,
        requester: &Requester,
        mut query: OrderQueryFilter,
    ) -> Result<Vec<Order>, LedgerApiError> {
        if let Some(owner) = requester.owner_filter() {
            query.user_id = Some(owner);
            query.include_deleted = false;
        }
        Ok(self.db.search_orders(query).await?)
    }

    /// Applies a partial update to an order and reconciles its ledger entry.
    ///
    /// The patch is validated and normalized here, then handed to the backend, which evaluates the reconciliation
    /// rules under one transaction (with the rollback-and-replay carve-out for the materialization race):
    ///
    /// 1. a settled entry blocks any total change with a `Conflict`,
    /// 2. a pending or cancelled entry follows the new positive total, reopening if it was cancelled,
    /// 3. a missing entry is materialized when the new total is positive,
    /// 4. a zero total cancels a pending entry, leaving its amount as a historical record.
    ///
    /// An empty patch is an idempotent no-op.
    pub async fn update_order(
        &self,
        requester: &Requester,
        order_id: i64,
        update: OrderUpdate,
    ) -> Result<OrderSyncResult, LedgerApiError> {
        let mut update = update;
        if let Some(description) = &update.new_description {
            let trimmed = description.trim();
            if trimmed.is_empty() {
                return Err(LedgerApiError::Validation("description must not be blank".to_string()));
            }
            update.new_description = Some(trimmed.to_string());
        }
        if let Some(total) = update.new_total {
            if total.is_negative() {
                return Err(LedgerApiError::Validation(format!("total must not be negative (got {total})")));
            }
        }
        if update.is_empty() {
            let order = self.fetch_order(requester, order_id).await?;
            let entry = self.db.entry_for_order(order_id).await?;
            return Ok(OrderSyncResult::new(OrderChanged::new(order.clone(), order), entry));
        }
        let result = self.db.update_order(order_id, requester.owner_filter(), update).await?;
        debug!("🔄️📦️ Order #{order_id} updated. Total is now {}", result.order().total);
        Ok(result)
    }

    /// Soft-deletes an order, cancelling its pending entry in the same transaction.
    ///
    /// Unlike reads, deletion distinguishes "not yours" from "does not exist": the requester's own ownership context
    /// already makes existence obvious, so a wrong owner is a permission violation, not a 404. A settled entry
    /// aborts the deletion with a `Conflict` and leaves both rows untouched.
    pub async fn delete_order(
        &self,
        requester: &Requester,
        order_id: i64,
    ) -> Result<(Order, CancelOutcome), LedgerApiError> {
        let order = self.db.order_by_id(order_id).await?.ok_or(LedgerApiError::NotFound("Order"))?;
        if !requester.can_act(order.user_id, false) {
            return Err(LedgerApiError::Forbidden(format!(
                "user {} may not delete order #{order_id}",
                requester.user_id
            )));
        }
        let (order, outcome) = self.db.delete_order(order_id, requester.user_id).await?;
        debug!("🔄️📦️ Order #{order_id} deleted by user {}", requester.user_id);
        Ok((order, outcome))
    }

    /// Restores a soft-deleted order. Elevated role only.
    pub async fn restore_order(&self, requester: &Requester, order_id: i64) -> Result<Order, LedgerApiError> {
        if !requester.is_admin {
            return Err(LedgerApiError::Forbidden("restoring orders requires an elevated role".to_string()));
        }
        let order = self.db.restore_order(order_id).await?;
        debug!("🔄️📦️ Order #{order_id} restored by user {}", requester.user_id);
        Ok(order)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
