use std::fmt::Display;

use chrono::{DateTime, Utc};
use ol_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::Order;

//--------------------------------------     OrderUpdate     ---------------------------------------------------------
/// A partial update to an order.
///
/// The patch is a pure description of the requested changes. It is never applied destructively to an in-memory order
/// before the database writes happen, so after a materialization race forces a rollback the same patch can be
/// replayed verbatim against a freshly loaded row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderUpdate {
    pub new_description: Option<String>,
    pub new_total: Option<Money>,
}

impl OrderUpdate {
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.new_description = Some(description.into());
        self
    }

    pub fn with_total(mut self, total: Money) -> Self {
        self.new_total = Some(total);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.new_description.is_none() && self.new_total.is_none()
    }
}

impl Display for OrderUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes.");
        }
        if let Some(description) = &self.new_description {
            write!(f, "description: {description}. ")?;
        }
        if let Some(total) = &self.new_total {
            write!(f, "total: {total}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------    OrderChanged     ---------------------------------------------------------
/// The before and after images of a mutated order. Exposed so that the transport layer can record audit events
/// without the engine depending on audit recording succeeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderChanged {
    pub fn new(old_order: Order, new_order: Order) -> Self {
        Self { old_order, new_order }
    }

    pub fn total_changed(&self) -> bool {
        self.old_order.total != self.new_order.total
    }
}

//--------------------------------------   OrderQueryFilter  ---------------------------------------------------------
/// Search criteria for orders. An unset field places no restriction on the result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub user_id: Option<i64>,
    pub description: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Soft-deleted orders are excluded unless this is set.
    pub include_deleted: bool,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() &&
            self.description.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            !self.include_deleted
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(description) = &self.description {
            write!(f, "description: {description}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if self.include_deleted {
            write!(f, "including deleted. ")?;
        }
        Ok(())
    }
}
