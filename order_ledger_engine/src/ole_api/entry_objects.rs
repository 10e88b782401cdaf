use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{EntryKind, EntryStatus, LedgerEntry};

//--------------------------------------    EntryChanged     ---------------------------------------------------------
/// Before and after images of a mutated ledger entry, for the transport layer's audit recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryChanged {
    pub old_entry: LedgerEntry,
    pub new_entry: LedgerEntry,
}

impl EntryChanged {
    pub fn new(old_entry: LedgerEntry, new_entry: LedgerEntry) -> Self {
        Self { old_entry, new_entry }
    }

    pub fn status_changed(&self) -> bool {
        self.old_entry.status != self.new_entry.status
    }
}

//--------------------------------------   EntryQueryFilter  ---------------------------------------------------------
/// Search criteria for ledger entries. An unset field places no restriction on the result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryQueryFilter {
    pub user_id: Option<i64>,
    pub order_id: Option<i64>,
    pub kind: Option<EntryKind>,
    pub status: Option<Vec<EntryStatus>>,
    /// Restricts on `occurred_at`, not `created_at`: reports care about when money moved, not when it was recorded.
    pub occurred_since: Option<DateTime<Utc>>,
    pub occurred_until: Option<DateTime<Utc>>,
}

impl EntryQueryFilter {
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn occurred_since(mut self, since: DateTime<Utc>) -> Self {
        self.occurred_since = Some(since);
        self
    }

    pub fn occurred_until(mut self, until: DateTime<Utc>) -> Self {
        self.occurred_until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() &&
            self.order_id.is_none() &&
            self.kind.is_none() &&
            self.status.is_none() &&
            self.occurred_since.is_none() &&
            self.occurred_until.is_none()
    }
}

impl Display for EntryQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(order_id) = &self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(kind) = &self.kind {
            write!(f, "kind: {kind}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(since) = &self.occurred_since {
            write!(f, "occurred since {since}. ")?;
        }
        if let Some(until) = &self.occurred_until {
            write!(f, "occurred until {until}. ")?;
        }
        Ok(())
    }
}
