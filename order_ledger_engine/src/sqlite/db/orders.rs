use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order},
    order_objects::{OrderQueryFilter, OrderUpdate},
    traits::LedgerStoreError,
};

/// Inserts a new order into the database using the given connection. This is not atomic on its own. Embed this call
/// inside a transaction and pass `&mut *tx` as the connection argument to pair it with the entry materialization.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LedgerStoreError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (user_id, description, total)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.description)
    .bind(order.total)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Returns the non-deleted order with the given id, if any.
pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND deleted_at IS NULL")
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

/// Returns the non-deleted order with the given id, restricted to `owner` when one is given.
///
/// A row that exists but is hidden by the scope comes back as `None`, exactly like a row that does not exist.
pub async fn fetch_order_scoped(
    order_id: i64,
    owner: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    match owner {
        Some(user_id) => {
            sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL")
                .bind(order_id)
                .bind(user_id)
                .fetch_optional(conn)
                .await
        },
        None => fetch_order(order_id, conn).await,
    }
}

/// Returns the order with the given id regardless of soft-delete state. Needed by restore.
pub async fn fetch_order_with_deleted(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await
}

/// Applies the patch to the order row and bumps `updated_at`. Returns `None` if the order does not exist or is
/// soft-deleted. An empty patch degenerates to a plain fetch.
pub(crate) async fn apply_update(
    order_id: i64,
    update: &OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerStoreError> {
    if update.is_empty() {
        debug!("📝️ No fields to update for order {order_id}. Update request skipped.");
        return Ok(fetch_order(order_id, conn).await?);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(description) = &update.new_description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description.clone());
    }
    if let Some(total) = update.new_total {
        set_clause.push("total = ");
        set_clause.push_bind_unseparated(total);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(order_id);
    builder.push(" AND deleted_at IS NULL RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let result = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Order::from_row(&row)).transpose()?;
    Ok(result)
}

/// Marks the order deleted, recording who deleted it. Returns `None` if the order does not exist or is already
/// deleted. The row itself is retained so the ledger entry's back-reference stays valid.
pub(crate) async fn soft_delete(
    order_id: i64,
    deleted_by: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerStoreError> {
    let result = sqlx::query_as(
        "UPDATE orders SET deleted_at = CURRENT_TIMESTAMP, deleted_by = $2, updated_at = CURRENT_TIMESTAMP WHERE id \
         = $1 AND deleted_at IS NULL RETURNING *",
    )
    .bind(order_id)
    .bind(deleted_by)
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

/// Clears the soft-delete marker. Returns `None` if the order does not exist or is not currently deleted.
pub(crate) async fn restore(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerStoreError> {
    let result = sqlx::query_as(
        "UPDATE orders SET deleted_at = NULL, deleted_by = NULL, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND \
         deleted_at IS NOT NULL RETURNING *",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at`, most recent first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    let has_conditions = !query.include_deleted ||
        query.user_id.is_some() ||
        query.description.is_some() ||
        query.since.is_some() ||
        query.until.is_some();
    if has_conditions {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if !query.include_deleted {
        where_clause.push("deleted_at IS NULL");
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(description) = query.description {
        where_clause.push("description LIKE ");
        where_clause.push_bind_unseparated(format!("%{description}%"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}
