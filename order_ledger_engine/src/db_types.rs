//! Data types shared between the database backends and the public engine APIs.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use ol_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------      EntryKind      ---------------------------------------------------------
/// Whether a ledger entry records money coming in or going out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryKind {
    /// Money owed to us. Order-driven entries are always revenue.
    Revenue,
    /// Money we owe. Only ever created as a standalone entry.
    Expense,
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Revenue => write!(f, "Revenue"),
            EntryKind::Expense => write!(f, "Expense"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Revenue" | "revenue" => Ok(Self::Revenue),
            "Expense" | "expense" => Ok(Self::Expense),
            s => Err(ConversionError(format!("Invalid entry kind: {s}. Use one of: Revenue, Expense"))),
        }
    }
}

//--------------------------------------     EntryStatus     ---------------------------------------------------------
/// The payment lifecycle of a ledger entry.
///
/// `Pending` is the initial state. User-initiated updates may only move `Pending` to `Paid` or `Cancelled`; the one
/// exception is the synchronization engine reopening a `Cancelled` entry when its order's total is raised above zero
/// again. `Paid` is terminal unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryStatus {
    /// The entry has been recorded and awaits settlement.
    Pending,
    /// The entry has been settled. No further changes are allowed.
    Paid,
    /// The entry has been voided, either directly or because its order was zeroed or deleted.
    Cancelled,
}

impl EntryStatus {
    /// Whether a *user-initiated* status update from `self` to `target` is legal.
    pub fn allows_transition_to(&self, target: EntryStatus) -> bool {
        matches!((*self, target), (EntryStatus::Pending, EntryStatus::Paid | EntryStatus::Cancelled))
    }
}

impl Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Pending => write!(f, "Pending"),
            EntryStatus::Paid => write!(f, "Paid"),
            EntryStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl From<String> for EntryStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid entry status: {value}. But this conversion cannot fail. Defaulting to Pending");
            EntryStatus::Pending
        })
    }
}

impl FromStr for EntryStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" | "pending" => Ok(Self::Pending),
            "Paid" | "paid" => Ok(Self::Paid),
            "Cancelled" | "cancelled" | "canceled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid entry status: {s}. Use one of: Pending, Paid, Cancelled"))),
        }
    }
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Elevated callers bypass owner-only scoping.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub is_admin: bool,
}

impl NewUser {
    pub fn new<S: Into<String>>(username: S) -> Self {
        Self { username: username.into(), is_admin: false }
    }

    pub fn admin<S: Into<String>>(username: S) -> Self {
        Self { username: username.into(), is_admin: true }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// The owner of the order. Non-elevated requesters only ever see their own orders.
    pub user_id: i64,
    pub description: String,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

impl Order {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: i64,
    pub description: String,
    pub total: Money,
}

impl NewOrder {
    pub fn new<S: Into<String>>(user_id: i64, description: S, total: Money) -> Self {
        Self { user_id, description: description.into(), total }
    }
}

//--------------------------------------     LedgerEntry     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    /// Back-reference to the owning order. `None` for manually created, standalone entries. The reference is weak:
    /// the entry outlives soft-deletion of its order.
    pub order_id: Option<i64>,
    pub user_id: i64,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub amount: Money,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
}

impl LedgerEntry {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_settled(&self) -> bool {
        self.status == EntryStatus::Paid
    }
}

//--------------------------------------       NewEntry      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    pub order_id: Option<i64>,
    pub user_id: i64,
    pub kind: EntryKind,
    pub amount: Money,
    pub description: String,
    /// When the underlying financial event happened. Defaults to "now" at insert time if omitted.
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewEntry {
    /// A manual entry with no owning order.
    pub fn standalone<S: Into<String>>(user_id: i64, kind: EntryKind, amount: Money, description: S) -> Self {
        Self { order_id: None, user_id, kind, amount, description: description.into(), occurred_at: None }
    }

    /// The revenue record materialized for an order. Orders always generate revenue.
    pub fn for_order<S: Into<String>>(order_id: i64, user_id: i64, amount: Money, description: S) -> Self {
        Self {
            order_id: Some(order_id),
            user_id,
            kind: EntryKind::Revenue,
            amount,
            description: description.into(),
            occurred_at: None,
        }
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}
