use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use ol_common::Money;

use crate::{
    access::Requester,
    db_types::{EntryKind, EntryStatus, LedgerEntry, NewEntry},
    entry_objects::{EntryChanged, EntryQueryFilter},
    ole_api::errors::LedgerApiError,
    traits::{CancelOutcome, LedgerDatabase, MaterializeResult},
};

/// `LedgerEntryApi` is the ledger entry lifecycle service: it owns entry creation, idempotent materialization from
/// orders, and the `Pending`/`Paid`/`Cancelled` state machine.
pub struct LedgerEntryApi<B> {
    db: B,
}

impl<B> Debug for LedgerEntryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerEntryApi")
    }
}

impl<B> LedgerEntryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> LedgerEntryApi<B>
where B: LedgerDatabase
{
    /// Records a manual, standalone entry (no owning order), status `Pending`.
    ///
    /// `occurred_at` defaults to "now" when omitted.
    pub async fn create_standalone(
        &self,
        requester: &Requester,
        kind: EntryKind,
        amount: Money,
        description: &str,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<LedgerEntry, LedgerApiError> {
        if amount.is_negative() {
            return Err(LedgerApiError::Validation(format!("amount must not be negative (got {amount})")));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerApiError::Validation("description must not be blank".to_string()));
        }
        let mut entry = NewEntry::standalone(requester.user_id, kind, amount, description);
        if let Some(occurred_at) = occurred_at {
            entry = entry.with_occurred_at(occurred_at);
        }
        let entry = self.db.insert_entry(entry).await?;
        debug!("🔄️🧾️ Manual {} entry {} recorded for user {}", entry.kind, entry.id, entry.user_id);
        Ok(entry)
    }

    /// Idempotently materializes the revenue entry for an order.
    ///
    /// Called whenever an order transitions to a positive total without an active entry. Calling it any number of
    /// times, concurrently or not, yields exactly one active entry for the order; a lost insert race is recovered by
    /// adopting the winner's row and is never surfaced as an error.
    pub async fn materialize_from_order(
        &self,
        order_id: i64,
        owner: i64,
        amount: Money,
        description: &str,
    ) -> Result<MaterializeResult, LedgerApiError> {
        if amount.is_negative() {
            return Err(LedgerApiError::Validation(format!("amount must not be negative (got {amount})")));
        }
        let result = self.db.materialize_entry(order_id, owner, amount, description).await?;
        trace!(
            "🔄️🧾️ Materialization for order #{order_id}: entry {} ({})",
            result.entry.id,
            if result.created { "created" } else { "already existed" }
        );
        Ok(result)
    }

    /// Moves an entry through its state machine.
    ///
    /// Setting the current status again is an idempotent no-op. Otherwise only `Pending → Paid` and
    /// `Pending → Cancelled` are legal; anything else fails with an error naming both states. The engine-internal
    /// `Cancelled → Pending` reopening is not reachable from here.
    pub async fn update_status(
        &self,
        requester: &Requester,
        entry_id: i64,
        new_status: EntryStatus,
    ) -> Result<EntryChanged, LedgerApiError> {
        let entry = self
            .db
            .entry_for_owner(entry_id, requester.owner_filter())
            .await?
            .ok_or(LedgerApiError::NotFound("Ledger entry"))?;
        if entry.status == new_status {
            return Ok(EntryChanged::new(entry.clone(), entry));
        }
        if !entry.status.allows_transition_to(new_status) {
            return Err(LedgerApiError::InvalidTransition { from: entry.status, to: new_status });
        }
        let updated = self.db.update_entry_status(entry_id, new_status).await?;
        debug!("🔄️🧾️ Entry {entry_id} moved from {} to {}", entry.status, updated.status);
        Ok(EntryChanged::new(entry, updated))
    }

    /// Cancels the active entry for an order, if any. Missing and already-cancelled entries are both success; a
    /// settled entry is a `Conflict` so the caller can block whatever triggered the cancellation.
    pub async fn cancel_for_order(&self, order_id: i64) -> Result<CancelOutcome, LedgerApiError> {
        Ok(self.db.cancel_entry_for_order(order_id).await?)
    }

    /// Fetches an entry visible to the requester. Hidden and missing entries are indistinguishable.
    pub async fn fetch_entry(&self, requester: &Requester, entry_id: i64) -> Result<LedgerEntry, LedgerApiError> {
        self.db
            .entry_for_owner(entry_id, requester.owner_filter())
            .await?
            .ok_or(LedgerApiError::NotFound("Ledger entry"))
    }

    /// Fetches entries matching the filter. Non-elevated requesters are confined to their own entries.
    pub async fn search_entries(
        &self,
        requester: &Requester,
        mut query: EntryQueryFilter,
    ) -> Result<Vec<LedgerEntry>, LedgerApiError> {
        if let Some(owner) = requester.owner_filter() {
            query.user_id = Some(owner);
        }
        Ok(self.db.search_entries(query).await?)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
