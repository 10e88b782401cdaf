//! End-to-end walkthroughs of the order/ledger synchronization flows against a real SQLite store.
mod support;

use ol_common::Money;
use order_ledger_engine::{
    access::Requester,
    db_types::{EntryKind, EntryStatus},
    order_objects::OrderUpdate,
    EntryManagement,
    LedgerApiError,
    OrderManagement,
};
use support::setup;

#[tokio::test]
async fn create_order_with_positive_total_materializes_entry() {
    let ctx = setup().await;
    let (order, entry) =
        ctx.orders.create_order(&ctx.alice, "Ten widgets", Money::from_major(100)).await.expect("create failed");
    let entry = entry.expect("no entry materialized");
    assert_eq!(entry.order_id, Some(order.id));
    assert_eq!(entry.user_id, order.user_id);
    assert_eq!(entry.kind, EntryKind::Revenue);
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.amount, order.total);
    // And it is the one the store reports as active for the order.
    let active = ctx.db.entry_for_order(order.id).await.unwrap().expect("no active entry");
    assert_eq!(active.id, entry.id);
}

#[tokio::test]
async fn create_order_with_zero_total_creates_no_entry() {
    let ctx = setup().await;
    let (order, entry) = ctx.orders.create_order(&ctx.alice, "Quote only", Money::from_major(0)).await.unwrap();
    assert!(entry.is_none());
    assert!(ctx.db.entry_for_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
async fn create_order_validations() {
    let ctx = setup().await;
    let err = ctx.orders.create_order(&ctx.alice, "   ", Money::from_major(10)).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::Validation(_)), "blank description must fail: {err}");
    let err = ctx.orders.create_order(&ctx.alice, "Negative", Money::from_cents(-1)).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::Validation(_)), "negative total must fail: {err}");
    // Unknown owner: the requester id does not exist in the users table.
    let ghost = Requester::new(9_999);
    let err = ctx.orders.create_order(&ghost, "Ghost order", Money::from_major(10)).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::Validation(_)), "unknown owner must fail validation: {err}");
}

/// The settlement-lock walkthrough from the synchronization rules: once the entry is paid, neither the total nor the
/// order row may move, and deletion is blocked.
#[tokio::test]
async fn settled_entry_locks_total_and_blocks_deletion() {
    let ctx = setup().await;
    let (order, entry) =
        ctx.orders.create_order(&ctx.alice, "Consulting retainer", Money::from_major(100)).await.unwrap();
    let entry = entry.unwrap();

    // Raise the total while pending: the entry follows.
    let result = ctx
        .orders
        .update_order(&ctx.alice, order.id, OrderUpdate::default().with_total(Money::from_major(250)))
        .await
        .unwrap();
    assert_eq!(result.order().total, Money::from_major(250));
    let synced = result.entry.as_ref().unwrap();
    assert_eq!(synced.amount, Money::from_major(250));
    assert_eq!(synced.status, EntryStatus::Pending);

    // Settle.
    let changed = ctx.entries.update_status(&ctx.alice, entry.id, EntryStatus::Paid).await.unwrap();
    assert_eq!(changed.new_entry.status, EntryStatus::Paid);

    // A different total is now a conflict, and nothing moves.
    let err = ctx
        .orders
        .update_order(&ctx.alice, order.id, OrderUpdate::default().with_total(Money::from_major(300)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::Conflict(_)), "expected conflict, got {err}");
    let order_now = ctx.orders.fetch_order(&ctx.alice, order.id).await.unwrap();
    assert_eq!(order_now.total, Money::from_major(250));
    let entry_now = ctx.db.entry_for_order(order.id).await.unwrap().unwrap();
    assert_eq!(entry_now.amount, Money::from_major(250));
    assert_eq!(entry_now.status, EntryStatus::Paid);

    // Deletion is blocked too, and the order stays live.
    let err = ctx.orders.delete_order(&ctx.alice, order.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::Conflict(_)), "expected conflict, got {err}");
    let order_now = ctx.orders.fetch_order(&ctx.alice, order.id).await.unwrap();
    assert!(order_now.deleted_at.is_none());
}

/// A settled entry only blocks totals that actually differ. Supplying the stored value is not a change.
#[tokio::test]
async fn equal_total_is_not_a_conflict_on_settled_entry() {
    let ctx = setup().await;
    let (order, entry) = ctx.orders.create_order(&ctx.alice, "Fixed bid", Money::from_major(80)).await.unwrap();
    ctx.entries.update_status(&ctx.alice, entry.unwrap().id, EntryStatus::Paid).await.unwrap();
    let update = OrderUpdate::default().with_total(Money::from_major(80)).with_description("Fixed bid, signed");
    let result = ctx.orders.update_order(&ctx.alice, order.id, update).await.expect("equal total must pass");
    assert_eq!(result.order().description, "Fixed bid, signed");
    assert_eq!(result.order().total, Money::from_major(80));
    let entry_now = ctx.db.entry_for_order(order.id).await.unwrap().unwrap();
    assert_eq!(entry_now.status, EntryStatus::Paid);
    assert_eq!(entry_now.amount, Money::from_major(80));
}

/// Zeroing an unsettled order cancels its entry but keeps the amount as a historical record.
#[tokio::test]
async fn zero_total_cancels_pending_entry() {
    let ctx = setup().await;
    let (order, _) = ctx.orders.create_order(&ctx.alice, "Cancelable job", Money::from_major(100)).await.unwrap();
    let result =
        ctx.orders.update_order(&ctx.alice, order.id, OrderUpdate::default().with_total(Money::from_major(0))).await.unwrap();
    assert_eq!(result.order().total, Money::from_major(0));
    let entry = result.entry.unwrap();
    assert_eq!(entry.status, EntryStatus::Cancelled);
    assert_eq!(entry.amount, Money::from_major(100), "cancelled amount is historical, not zeroed");
}

/// The full reopen cycle: no entry at zero, materialize on first positive total, cancel at zero, reopen on the next
/// positive total. The reopened entry is the same row, with the new amount.
#[tokio::test]
async fn total_cycle_materializes_cancels_and_reopens() {
    let ctx = setup().await;
    let (order, entry) = ctx.orders.create_order(&ctx.alice, "On-and-off project", Money::from_major(0)).await.unwrap();
    assert!(entry.is_none());

    let result =
        ctx.orders.update_order(&ctx.alice, order.id, OrderUpdate::default().with_total(Money::from_major(50))).await.unwrap();
    let entry = result.entry.expect("entry must be materialized on first positive total");
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.amount, Money::from_major(50));

    let result =
        ctx.orders.update_order(&ctx.alice, order.id, OrderUpdate::default().with_total(Money::from_major(0))).await.unwrap();
    let cancelled = result.entry.unwrap();
    assert_eq!(cancelled.id, entry.id);
    assert_eq!(cancelled.status, EntryStatus::Cancelled);

    let result =
        ctx.orders.update_order(&ctx.alice, order.id, OrderUpdate::default().with_total(Money::from_major(75))).await.unwrap();
    let reopened = result.entry.unwrap();
    assert_eq!(reopened.id, entry.id, "reopening reuses the existing entry");
    assert_eq!(reopened.status, EntryStatus::Pending);
    assert_eq!(reopened.amount, Money::from_major(75));

    // Exactly one entry ever existed for this order.
    let active = ctx.db.entry_for_order(order.id).await.unwrap().unwrap();
    assert_eq!(active.id, entry.id);
}

#[tokio::test]
async fn description_change_does_not_touch_the_entry() {
    let ctx = setup().await;
    let (order, entry) = ctx.orders.create_order(&ctx.alice, "Old name", Money::from_major(60)).await.unwrap();
    let entry = entry.unwrap();
    let result =
        ctx.orders.update_order(&ctx.alice, order.id, OrderUpdate::default().with_description("New name")).await.unwrap();
    assert_eq!(result.order().description, "New name");
    assert_eq!(result.order().total, Money::from_major(60));
    let entry_now = ctx.db.entry_for_order(order.id).await.unwrap().unwrap();
    assert_eq!(entry_now.amount, entry.amount);
    assert_eq!(entry_now.status, entry.status);
}

#[tokio::test]
async fn empty_update_is_an_idempotent_noop() {
    let ctx = setup().await;
    let (order, _) = ctx.orders.create_order(&ctx.alice, "Steady state", Money::from_major(40)).await.unwrap();
    let result = ctx.orders.update_order(&ctx.alice, order.id, OrderUpdate::default()).await.unwrap();
    assert_eq!(result.orders.old_order.id, result.orders.new_order.id);
    assert!(!result.orders.total_changed());
    assert_eq!(result.order().total, Money::from_major(40));
}

#[tokio::test]
async fn update_validations() {
    let ctx = setup().await;
    let (order, _) = ctx.orders.create_order(&ctx.alice, "Validated", Money::from_major(10)).await.unwrap();
    let err = ctx
        .orders
        .update_order(&ctx.alice, order.id, OrderUpdate::default().with_description("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::Validation(_)), "blank description must fail: {err}");
    let err = ctx
        .orders
        .update_order(&ctx.alice, order.id, OrderUpdate::default().with_total(Money::from_cents(-500)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::Validation(_)), "negative total must fail: {err}");
}

/// Tenancy: another user's order reads as "not found", never as "forbidden", so existence cannot be probed.
#[tokio::test]
async fn updates_and_reads_do_not_leak_existence() {
    let ctx = setup().await;
    let (order, _) = ctx.orders.create_order(&ctx.alice, "Private order", Money::from_major(10)).await.unwrap();

    let err = ctx.orders.fetch_order(&ctx.bob, order.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::NotFound(_)), "foreign fetch must be NotFound: {err}");
    let missing = ctx.orders.fetch_order(&ctx.bob, 424_242).await.unwrap_err();
    assert_eq!(err.to_string(), missing.to_string(), "hidden and missing orders must be indistinguishable");

    let err = ctx
        .orders
        .update_order(&ctx.bob, order.id, OrderUpdate::default().with_total(Money::from_major(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::NotFound(_)), "foreign update must be NotFound: {err}");

    // Elevated callers see everything.
    let fetched = ctx.orders.fetch_order(&ctx.admin, order.id).await.unwrap();
    assert_eq!(fetched.id, order.id);
}

/// Deletion is the one place ownership violations are explicit: the caller named a resource they can see exists.
#[tokio::test]
async fn delete_requires_ownership_or_elevation() {
    let ctx = setup().await;
    let (order, _) = ctx.orders.create_order(&ctx.alice, "Alice's order", Money::from_major(20)).await.unwrap();

    let err = ctx.orders.delete_order(&ctx.bob, order.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::Forbidden(_)), "foreign delete must be Forbidden: {err}");
    let still_there = ctx.orders.fetch_order(&ctx.alice, order.id).await.unwrap();
    assert!(still_there.deleted_at.is_none());

    let (deleted, _) = ctx.orders.delete_order(&ctx.admin, order.id).await.unwrap();
    assert!(deleted.deleted_at.is_some());
    assert_eq!(deleted.deleted_by, Some(ctx.admin.user_id));
}

#[tokio::test]
async fn delete_cancels_entry_and_restore_brings_the_order_back() {
    let ctx = setup().await;
    let (order, entry) = ctx.orders.create_order(&ctx.alice, "Doomed order", Money::from_major(30)).await.unwrap();
    let entry = entry.unwrap();

    let (deleted, _) = ctx.orders.delete_order(&ctx.alice, order.id).await.unwrap();
    assert_eq!(deleted.deleted_by, Some(ctx.alice.user_id));
    // The entry is cancelled, not deleted, and its back-reference still resolves to the retained order row.
    let entry_now = ctx.db.entry_for_order(order.id).await.unwrap().unwrap();
    assert_eq!(entry_now.id, entry.id);
    assert_eq!(entry_now.status, EntryStatus::Cancelled);
    let retained = ctx.db.order_by_id_with_deleted(order.id).await.unwrap().unwrap();
    assert!(retained.deleted_at.is_some());

    // Deleted orders have vanished from normal reads.
    let err = ctx.orders.fetch_order(&ctx.alice, order.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::NotFound(_)));

    // Restore is admin-only.
    let err = ctx.orders.restore_order(&ctx.alice, order.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::Forbidden(_)));
    let restored = ctx.orders.restore_order(&ctx.admin, order.id).await.unwrap();
    assert!(restored.deleted_at.is_none());
    assert!(restored.deleted_by.is_none());
    assert!(ctx.orders.fetch_order(&ctx.alice, order.id).await.is_ok());

    // Restoring a live order is "not found": there is nothing deleted to restore.
    let err = ctx.orders.restore_order(&ctx.admin, order.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::NotFound(_)));
}

#[tokio::test]
async fn search_orders_is_tenant_scoped() {
    let ctx = setup().await;
    ctx.orders.create_order(&ctx.alice, "Alice one", Money::from_major(10)).await.unwrap();
    ctx.orders.create_order(&ctx.alice, "Alice two", Money::from_major(20)).await.unwrap();
    ctx.orders.create_order(&ctx.bob, "Bob one", Money::from_major(30)).await.unwrap();

    let mine = ctx.orders.search_orders(&ctx.alice, Default::default()).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|o| o.user_id == ctx.alice.user_id));

    let all = ctx.orders.search_orders(&ctx.admin, Default::default()).await.unwrap();
    assert_eq!(all.len(), 3);
}
