use chrono::Utc;
use log::{debug, trace, warn};
use ol_common::Money;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{EntryStatus, LedgerEntry, NewEntry},
    entry_objects::EntryQueryFilter,
    traits::{CancelOutcome, LedgerStoreError, MaterializeResult},
};

/// Inserts a new ledger entry with status `Pending`.
///
/// A rejection by the one-active-entry-per-order index is reported as
/// [`LedgerStoreError::DuplicateEntryForOrder`] so that callers can tell the materialization race apart from real
/// database failures.
pub async fn insert_entry(entry: NewEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, LedgerStoreError> {
    let occurred_at = entry.occurred_at.unwrap_or_else(Utc::now);
    let result = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (order_id, user_id, kind, status, amount, description, occurred_at)
            VALUES ($1, $2, $3, 'Pending', $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(entry.order_id)
    .bind(entry.user_id)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.description)
    .bind(occurred_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(entry) => Ok(entry),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerStoreError::DuplicateEntryForOrder(entry.order_id.unwrap_or_default()))
        },
        Err(e) => Err(e.into()),
    }
}

/// Returns the non-deleted entry with the given id, if any.
pub async fn fetch_entry(entry_id: i64, conn: &mut SqliteConnection) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE id = $1 AND deleted_at IS NULL")
        .bind(entry_id)
        .fetch_optional(conn)
        .await
}

/// Returns the non-deleted entry with the given id, restricted to `owner` when one is given.
pub async fn fetch_entry_scoped(
    entry_id: i64,
    owner: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    match owner {
        Some(user_id) => {
            sqlx::query_as("SELECT * FROM ledger_entries WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL")
                .bind(entry_id)
                .bind(user_id)
                .fetch_optional(conn)
                .await
        },
        None => fetch_entry(entry_id, conn).await,
    }
}

/// Returns the active entry referencing the given order. The partial unique index guarantees at most one row.
pub async fn entry_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ledger_entries WHERE order_id = $1 AND deleted_at IS NULL")
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

pub(crate) async fn update_status(
    entry_id: i64,
    status: EntryStatus,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, LedgerStoreError> {
    let result: Option<LedgerEntry> = sqlx::query_as(
        "UPDATE ledger_entries SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND deleted_at IS NULL \
         RETURNING *",
    )
    .bind(status)
    .bind(entry_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(LedgerStoreError::EntryNotFound(entry_id))
}

/// Rewrites the entry's amount and status in one statement. This is the reconciliation write that keeps
/// `entry.amount == order.total` while the order is unsettled, and the only path that may move `Cancelled` back to
/// `Pending`.
pub(crate) async fn reconcile(
    entry_id: i64,
    amount: Money,
    status: EntryStatus,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, LedgerStoreError> {
    let result: Option<LedgerEntry> = sqlx::query_as(
        "UPDATE ledger_entries SET amount = $1, status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 AND \
         deleted_at IS NULL RETURNING *",
    )
    .bind(amount)
    .bind(status)
    .bind(entry_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(LedgerStoreError::EntryNotFound(entry_id))
}

/// Idempotently materializes the revenue entry for an order. See the flow's three steps:
///
/// 1. an existing active entry is returned unchanged (fast path, no reliance on the constraint),
/// 2. otherwise a `Pending` revenue entry is inserted,
/// 3. if the insert loses against a concurrent materialization, the winner's row is re-read and returned as if this
///    call had created it. The race never escapes this function.
pub async fn materialize(
    order_id: i64,
    user_id: i64,
    amount: Money,
    description: &str,
    conn: &mut SqliteConnection,
) -> Result<MaterializeResult, LedgerStoreError> {
    if let Some(existing) = entry_for_order(order_id, &mut *conn).await? {
        trace!("🧾️ Order #{order_id} already has entry {}. Materialization is a no-op.", existing.id);
        return Ok(MaterializeResult::existing(existing));
    }
    let entry = NewEntry::for_order(order_id, user_id, amount, description);
    match insert_entry(entry, &mut *conn).await {
        Ok(entry) => {
            debug!("🧾️ Entry {} materialized for order #{order_id} ({amount})", entry.id);
            Ok(MaterializeResult::created(entry))
        },
        Err(LedgerStoreError::DuplicateEntryForOrder(_)) => {
            warn!("🧾️ Lost the materialization race for order #{order_id}. Adopting the winner's entry.");
            match entry_for_order(order_id, conn).await? {
                Some(winner) => Ok(MaterializeResult::existing(winner)),
                // The violation came from somewhere other than a concurrent winner. Surface it.
                None => Err(LedgerStoreError::DuplicateEntryForOrder(order_id)),
            }
        },
        Err(e) => Err(e),
    }
}

/// Cancels the active entry for an order, if there is one. A settled entry is an error; everything else is some
/// flavor of success, so that order deletion can proceed.
pub(crate) async fn cancel_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<CancelOutcome, LedgerStoreError> {
    let entry = match entry_for_order(order_id, &mut *conn).await? {
        Some(entry) => entry,
        None => return Ok(CancelOutcome::NoEntry),
    };
    match entry.status {
        EntryStatus::Paid => Err(LedgerStoreError::EntrySettled(order_id)),
        EntryStatus::Cancelled => Ok(CancelOutcome::AlreadyCancelled(entry)),
        EntryStatus::Pending => {
            let cancelled = update_status(entry.id, EntryStatus::Cancelled, conn).await?;
            debug!("🧾️ Entry {} for order #{order_id} cancelled", cancelled.id);
            Ok(CancelOutcome::Cancelled(cancelled))
        },
    }
}

/// Fetches entries according to criteria specified in the `EntryQueryFilter`.
///
/// Soft-deleted entries are never returned. Results are ordered by `occurred_at`, most recent first.
pub async fn search_entries(
    query: EntryQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM ledger_entries
    "#,
    );
    builder.push("WHERE ");
    let mut where_clause = builder.separated(" AND ");
    where_clause.push("deleted_at IS NULL");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(kind) = query.kind {
        where_clause.push("kind = ");
        where_clause.push_bind_unseparated(kind);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let mut statuses = vec![];
        query.status.as_ref().unwrap().iter().for_each(|s| {
            statuses.push(format!("'{s}'"));
        });
        let status_clause = statuses.join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(since) = query.occurred_since {
        where_clause.push("occurred_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.occurred_until {
        where_clause.push("occurred_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY occurred_at DESC");

    trace!("🧾️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<LedgerEntry>();
    let entries = query.fetch_all(conn).await?;
    trace!("🧾️ Result of search_entries: {:?}", entries.len());
    Ok(entries)
}
