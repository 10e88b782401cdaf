//! `SqliteDatabase` is a concrete implementation of an order-ledger engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every compound write runs inside a single transaction obtained from the pool, so the order row and its
//! ledger entry are durable together or not at all.
use std::fmt::Debug;

use log::*;
use ol_common::Money;
use sqlx::SqlitePool;

use super::db::{db_url, entries, new_pool, orders, users};
use crate::{
    db_types::{EntryStatus, LedgerEntry, NewEntry, NewOrder, NewUser, Order, User},
    entry_objects::EntryQueryFilter,
    order_objects::{OrderChanged, OrderQueryFilter, OrderUpdate},
    traits::{
        CancelOutcome,
        EntryManagement,
        LedgerDatabase,
        LedgerStoreError,
        MaterializeResult,
        OrderManagement,
        OrderSyncResult,
        UserManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, LedgerStoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerStoreError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The repair path for a lost materialization race inside [`LedgerDatabase::update_order`].
    ///
    /// The failed insert forced the original transaction to roll back, taking the order's own field changes with it.
    /// Because the patch is a pure description of the requested changes, it can be replayed verbatim here: re-fetch
    /// the order, re-apply every pending field change, then point the winner's entry at the new total.
    async fn replay_update_after_race(
        &self,
        order_id: i64,
        owner: Option<i64>,
        update: OrderUpdate,
    ) -> Result<OrderSyncResult, LedgerStoreError> {
        let mut tx = self.pool.begin().await?;
        let old_order = orders::fetch_order_scoped(order_id, owner, &mut tx)
            .await?
            .ok_or(LedgerStoreError::OrderNotFound(order_id))?;
        let new_order =
            orders::apply_update(order_id, &update, &mut tx).await?.ok_or(LedgerStoreError::OrderNotFound(order_id))?;
        let mut entry = entries::entry_for_order(order_id, &mut tx).await?;
        if let (Some(winner), Some(total)) = (&entry, update.new_total) {
            entry = Some(entries::reconcile(winner.id, total, winner.status, &mut tx).await?);
        }
        tx.commit().await?;
        debug!("🔄️ Order #{order_id} update replayed after materialization race");
        Ok(OrderSyncResult::new(OrderChanged::new(old_order, new_order), entry))
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(user, &mut conn).await?;
        debug!("🗃️ User '{}' created with id {}", user.username, user.id);
        Ok(user)
    }

    async fn create_order(&self, order: NewOrder) -> Result<(Order, Option<LedgerEntry>), LedgerStoreError> {
        let mut tx = self.pool.begin().await?;
        if !users::user_exists(order.user_id, &mut tx).await? {
            return Err(LedgerStoreError::UserNotFound(order.user_id));
        }
        let total = order.total;
        let order = orders::insert_order(order, &mut tx).await?;
        debug!("🗃️ Order #{} has been saved in the DB for user {}", order.id, order.user_id);
        let entry = if total.is_zero() {
            None
        } else {
            let description = format!("Order {} - {}", order.id, order.description);
            let result = entries::materialize(order.id, order.user_id, total, &description, &mut tx).await?;
            Some(result.entry)
        };
        tx.commit().await?;
        Ok((order, entry))
    }

    async fn update_order(
        &self,
        order_id: i64,
        owner: Option<i64>,
        update: OrderUpdate,
    ) -> Result<OrderSyncResult, LedgerStoreError> {
        let mut tx = self.pool.begin().await?;
        let old_order = orders::fetch_order_scoped(order_id, owner, &mut tx)
            .await?
            .ok_or(LedgerStoreError::OrderNotFound(order_id))?;
        let entry = entries::entry_for_order(order_id, &mut tx).await?;
        // Only a total that actually differs from the stored value triggers reconciliation.
        let new_total = update.new_total.filter(|t| *t != old_order.total);
        if new_total.is_some() {
            if let Some(e) = &entry {
                if e.is_settled() {
                    return Err(LedgerStoreError::EntrySettled(order_id));
                }
            }
        }
        let new_order =
            orders::apply_update(order_id, &update, &mut tx).await?.ok_or(LedgerStoreError::OrderNotFound(order_id))?;
        let mut synced = entry.clone();
        if let Some(total) = new_total {
            synced = if total.is_zero() {
                match &entry {
                    // A zeroed order cancels its pending entry. The amount stays put as a historical record.
                    Some(e) if e.status == EntryStatus::Pending => {
                        Some(entries::update_status(e.id, EntryStatus::Cancelled, &mut tx).await?)
                    },
                    other => other.clone(),
                }
            } else {
                match &entry {
                    Some(e) => {
                        let status =
                            if e.status == EntryStatus::Cancelled { EntryStatus::Pending } else { e.status };
                        if status != e.status {
                            debug!("🔄️ Entry {} for order #{order_id} reopened by total change", e.id);
                        }
                        Some(entries::reconcile(e.id, total, status, &mut tx).await?)
                    },
                    None => {
                        let description = format!("Order {order_id} - {}", new_order.description);
                        let new_entry = NewEntry::for_order(order_id, old_order.user_id, total, description);
                        match entries::insert_entry(new_entry, &mut tx).await {
                            Ok(e) => Some(e),
                            Err(LedgerStoreError::DuplicateEntryForOrder(_)) => {
                                // A concurrent request materialized the entry first. Discard this transaction
                                // entirely and replay the patch against the winner's state.
                                warn!(
                                    "🔄️ Order #{order_id} update hit the materialization race. Rolling back and \
                                     replaying."
                                );
                                tx.rollback().await?;
                                return self.replay_update_after_race(order_id, owner, update).await;
                            },
                            Err(e) => return Err(e),
                        }
                    },
                }
            };
        }
        tx.commit().await?;
        trace!("🔄️ Order #{order_id} update committed");
        Ok(OrderSyncResult::new(OrderChanged::new(old_order, new_order), synced))
    }

    async fn delete_order(&self, order_id: i64, deleted_by: i64) -> Result<(Order, CancelOutcome), LedgerStoreError> {
        let mut tx = self.pool.begin().await?;
        // A settled entry aborts the whole deletion here, before the order row is touched.
        let outcome = entries::cancel_for_order(order_id, &mut tx).await?;
        let order = orders::soft_delete(order_id, deleted_by, &mut tx)
            .await?
            .ok_or(LedgerStoreError::OrderNotFound(order_id))?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} soft-deleted by user {deleted_by}");
        Ok((order, outcome))
    }

    async fn restore_order(&self, order_id: i64) -> Result<Order, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order =
            orders::restore(order_id, &mut conn).await?.ok_or(LedgerStoreError::OrderNotFound(order_id))?;
        debug!("🗃️ Order #{order_id} restored");
        Ok(order)
    }

    async fn insert_entry(&self, entry: NewEntry) -> Result<LedgerEntry, LedgerStoreError> {
        let mut tx = self.pool.begin().await?;
        if !users::user_exists(entry.user_id, &mut tx).await? {
            return Err(LedgerStoreError::UserNotFound(entry.user_id));
        }
        let entry = entries::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        debug!("🧾️ Standalone {} entry {} recorded ({})", entry.kind, entry.id, entry.amount);
        Ok(entry)
    }

    async fn materialize_entry(
        &self,
        order_id: i64,
        owner: i64,
        amount: Money,
        description: &str,
    ) -> Result<MaterializeResult, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        entries::materialize(order_id, owner, amount, description, &mut conn).await
    }

    async fn update_entry_status(&self, entry_id: i64, status: EntryStatus) -> Result<LedgerEntry, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        let entry = entries::update_status(entry_id, status, &mut conn).await?;
        debug!("🧾️ Entry {entry_id} is now {status}");
        Ok(entry)
    }

    async fn cancel_entry_for_order(&self, order_id: i64) -> Result<CancelOutcome, LedgerStoreError> {
        let mut tx = self.pool.begin().await?;
        let outcome = entries::cancel_for_order(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn close(&mut self) -> Result<(), LedgerStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_by_id(&self, order_id: i64) -> Result<Option<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn order_for_owner(&self, order_id: i64, owner: Option<i64>) -> Result<Option<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_scoped(order_id, owner, &mut conn).await?)
    }

    async fn order_by_id_with_deleted(&self, order_id: i64) -> Result<Option<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_with_deleted(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }
}

impl EntryManagement for SqliteDatabase {
    async fn entry_by_id(&self, entry_id: i64) -> Result<Option<LedgerEntry>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(entries::fetch_entry(entry_id, &mut conn).await?)
    }

    async fn entry_for_owner(
        &self,
        entry_id: i64,
        owner: Option<i64>,
    ) -> Result<Option<LedgerEntry>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(entries::fetch_entry_scoped(entry_id, owner, &mut conn).await?)
    }

    async fn entry_for_order(&self, order_id: i64) -> Result<Option<LedgerEntry>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(entries::entry_for_order(order_id, &mut conn).await?)
    }

    async fn search_entries(&self, query: EntryQueryFilter) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(entries::search_entries(query, &mut conn).await?)
    }
}

impl UserManagement for SqliteDatabase {
    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(user_id, &mut conn).await?)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_username(username, &mut conn).await?)
    }
}
