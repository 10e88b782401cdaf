//! The ledger entry state machine and standalone-entry flows against a real SQLite store.
mod support;

use chrono::{Duration, Utc};
use ol_common::Money;
use order_ledger_engine::{
    db_types::{EntryKind, EntryStatus},
    entry_objects::EntryQueryFilter,
    CancelOutcome,
    LedgerApiError,
};
use support::setup;

#[tokio::test]
async fn standalone_entries_start_pending_with_no_order() {
    let ctx = setup().await;
    let entry = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Expense, Money::from_cents(1_999), "Office chair", None)
        .await
        .unwrap();
    assert!(entry.order_id.is_none());
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.kind, EntryKind::Expense);
    assert_eq!(entry.amount, Money::from_cents(1_999));
}

#[tokio::test]
async fn standalone_entry_validations() {
    let ctx = setup().await;
    let err = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_cents(-1), "Bad amount", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::Validation(_)), "negative amount must fail: {err}");
    let err = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_major(5), "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::Validation(_)), "blank description must fail: {err}");
}

#[tokio::test]
async fn occurred_at_defaults_to_now_and_accepts_overrides() {
    let ctx = setup().await;
    let before = Utc::now() - Duration::seconds(5);
    let entry = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_major(10), "Walk-in sale", None)
        .await
        .unwrap();
    assert!(entry.occurred_at >= before, "default occurred_at should be 'now'");

    let last_week = Utc::now() - Duration::days(7);
    let entry = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_major(10), "Late paperwork", Some(last_week))
        .await
        .unwrap();
    assert!((entry.occurred_at - last_week).num_seconds().abs() <= 1);
}

#[tokio::test]
async fn status_machine_accepts_only_pending_exits() {
    let ctx = setup().await;
    let entry = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_major(10), "State machine", None)
        .await
        .unwrap();

    // Same status: idempotent no-op.
    let unchanged = ctx.entries.update_status(&ctx.alice, entry.id, EntryStatus::Pending).await.unwrap();
    assert!(!unchanged.status_changed());

    // Pending → Paid is legal, and Paid is terminal.
    let changed = ctx.entries.update_status(&ctx.alice, entry.id, EntryStatus::Paid).await.unwrap();
    assert_eq!(changed.new_entry.status, EntryStatus::Paid);
    let err = ctx.entries.update_status(&ctx.alice, entry.id, EntryStatus::Pending).await.unwrap_err();
    match &err {
        LedgerApiError::InvalidTransition { from, to } => {
            assert_eq!(*from, EntryStatus::Paid);
            assert_eq!(*to, EntryStatus::Pending);
        },
        other => panic!("expected InvalidTransition, got {other}"),
    }
    // The message names both states and the legal moves.
    assert!(err.to_string().contains("Paid"));
    assert!(err.to_string().contains("Pending"));
    let err = ctx.entries.update_status(&ctx.alice, entry.id, EntryStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::InvalidTransition { .. }));

    // Cancelled is terminal for direct requests too; reopening is the sync engine's move alone.
    let entry = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_major(10), "To cancel", None)
        .await
        .unwrap();
    ctx.entries.update_status(&ctx.alice, entry.id, EntryStatus::Cancelled).await.unwrap();
    let err = ctx.entries.update_status(&ctx.alice, entry.id, EntryStatus::Pending).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::InvalidTransition { .. }));
}

#[tokio::test]
async fn cancel_for_order_covers_all_outcomes() {
    let ctx = setup().await;

    // No entry at all: proceed.
    let (bare_order, _) = ctx.orders.create_order(&ctx.alice, "No entry", Money::from_major(0)).await.unwrap();
    assert!(matches!(ctx.entries.cancel_for_order(bare_order.id).await.unwrap(), CancelOutcome::NoEntry));

    // Pending: cancelled now, and again is idempotent.
    let (order, _) = ctx.orders.create_order(&ctx.alice, "Pending entry", Money::from_major(10)).await.unwrap();
    let outcome = ctx.entries.cancel_for_order(order.id).await.unwrap();
    match outcome {
        CancelOutcome::Cancelled(e) => assert_eq!(e.status, EntryStatus::Cancelled),
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert!(matches!(ctx.entries.cancel_for_order(order.id).await.unwrap(), CancelOutcome::AlreadyCancelled(_)));

    // Paid: blocked.
    let (order, entry) = ctx.orders.create_order(&ctx.alice, "Paid entry", Money::from_major(10)).await.unwrap();
    ctx.entries.update_status(&ctx.alice, entry.unwrap().id, EntryStatus::Paid).await.unwrap();
    let err = ctx.entries.cancel_for_order(order.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::Conflict(_)), "settled entry must conflict: {err}");
}

#[tokio::test]
async fn materialization_is_idempotent_sequentially() {
    let ctx = setup().await;
    let (order, _) = ctx.orders.create_order(&ctx.alice, "Materialize me", Money::from_major(0)).await.unwrap();
    let first = ctx
        .entries
        .materialize_from_order(order.id, ctx.alice.user_id, Money::from_major(40), "Order revenue")
        .await
        .unwrap();
    assert!(first.created);
    let second = ctx
        .entries
        .materialize_from_order(order.id, ctx.alice.user_id, Money::from_major(40), "Order revenue")
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.entry.id, first.entry.id);
}

#[tokio::test]
async fn entry_reads_do_not_leak_existence() {
    let ctx = setup().await;
    let entry = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_major(10), "Private entry", None)
        .await
        .unwrap();

    let err = ctx.entries.fetch_entry(&ctx.bob, entry.id).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::NotFound(_)));
    let missing = ctx.entries.fetch_entry(&ctx.bob, 424_242).await.unwrap_err();
    assert_eq!(err.to_string(), missing.to_string(), "hidden and missing entries must be indistinguishable");

    let err = ctx.entries.update_status(&ctx.bob, entry.id, EntryStatus::Paid).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::NotFound(_)));

    // The admin both sees and settles it.
    let changed = ctx.entries.update_status(&ctx.admin, entry.id, EntryStatus::Paid).await.unwrap();
    assert_eq!(changed.new_entry.status, EntryStatus::Paid);
}

#[tokio::test]
async fn search_entries_scopes_and_filters() {
    let ctx = setup().await;
    ctx.entries
        .create_standalone(&ctx.alice, EntryKind::Revenue, Money::from_major(10), "Alice revenue", None)
        .await
        .unwrap();
    let expense = ctx
        .entries
        .create_standalone(&ctx.alice, EntryKind::Expense, Money::from_major(5), "Alice expense", None)
        .await
        .unwrap();
    ctx.entries
        .create_standalone(&ctx.bob, EntryKind::Revenue, Money::from_major(7), "Bob revenue", None)
        .await
        .unwrap();
    ctx.entries.update_status(&ctx.alice, expense.id, EntryStatus::Cancelled).await.unwrap();

    let mine = ctx.entries.search_entries(&ctx.alice, EntryQueryFilter::default()).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|e| e.user_id == ctx.alice.user_id));

    let all = ctx.entries.search_entries(&ctx.admin, EntryQueryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let cancelled = ctx
        .entries
        .search_entries(&ctx.admin, EntryQueryFilter::default().with_status(EntryStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, expense.id);

    let expenses =
        ctx.entries.search_entries(&ctx.admin, EntryQueryFilter::default().with_kind(EntryKind::Expense)).await.unwrap();
    assert_eq!(expenses.len(), 1);
}
