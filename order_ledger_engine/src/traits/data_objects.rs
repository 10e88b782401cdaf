use serde::{Deserialize, Serialize};

use crate::{
    db_types::{LedgerEntry, Order},
    order_objects::OrderChanged,
};

/// The result of an idempotent materialization: the active entry for the order, and whether this call created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializeResult {
    pub entry: LedgerEntry,
    pub created: bool,
}

impl MaterializeResult {
    pub fn created(entry: LedgerEntry) -> Self {
        Self { entry, created: true }
    }

    pub fn existing(entry: LedgerEntry) -> Self {
        Self { entry, created: false }
    }
}

/// The outcome of cancelling an order's entry. All three variants mean "proceed"; a settled entry is an error, not
/// an outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// The order has no active entry. Nothing to do.
    NoEntry,
    /// A pending entry was transitioned to `Cancelled`.
    Cancelled(LedgerEntry),
    /// The entry was already cancelled. Idempotent success.
    AlreadyCancelled(LedgerEntry),
}

impl CancelOutcome {
    pub fn entry(&self) -> Option<&LedgerEntry> {
        match self {
            CancelOutcome::NoEntry => None,
            CancelOutcome::Cancelled(entry) | CancelOutcome::AlreadyCancelled(entry) => Some(entry),
        }
    }
}

/// Everything a single order-update call changed: the order's before/after images and the reconciled entry, if the
/// order has one. Exposed to the transport layer for audit recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSyncResult {
    pub orders: OrderChanged,
    pub entry: Option<LedgerEntry>,
}

impl OrderSyncResult {
    pub fn new(orders: OrderChanged, entry: Option<LedgerEntry>) -> Self {
        Self { orders, entry }
    }

    pub fn order(&self) -> &Order {
        &self.orders.new_order
    }
}
