use thiserror::Error;

use crate::{db_types::EntryStatus, traits::LedgerStoreError};

/// The error taxonomy shared by both engine services.
///
/// Every variant maps onto exactly one transport status, so the HTTP wrapper can translate mechanically:
/// `Validation` and `InvalidTransition` are 400s, `NotFound` a 404, `Forbidden` a 403, `Conflict` a 409 and
/// `Database` a 500. `NotFound` deliberately covers both "does not exist" and "exists but is not visible to this
/// requester" so that non-owners cannot probe for existence.
#[derive(Debug, Clone, Error)]
pub enum LedgerApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid transition: {from} → {to}. Only Pending may move to Paid or Cancelled.")]
    InvalidTransition { from: EntryStatus, to: EntryStatus },
    #[error("Database error: {0}")]
    Database(String),
}

impl From<LedgerStoreError> for LedgerApiError {
    fn from(e: LedgerStoreError) -> Self {
        match e {
            LedgerStoreError::DatabaseError(msg) => LedgerApiError::Database(msg),
            LedgerStoreError::OrderNotFound(_) => LedgerApiError::NotFound("Order"),
            LedgerStoreError::EntryNotFound(_) => LedgerApiError::NotFound("Ledger entry"),
            LedgerStoreError::UserNotFound(id) => {
                LedgerApiError::Validation(format!("Invalid user_id: user {id} does not exist"))
            },
            LedgerStoreError::DuplicateUser(name) => {
                LedgerApiError::Conflict(format!("A user named '{name}' already exists"))
            },
            LedgerStoreError::DuplicateEntryForOrder(id) => {
                LedgerApiError::Conflict(format!("Order {id} already has an active ledger entry"))
            },
            LedgerStoreError::EntrySettled(id) => {
                LedgerApiError::Conflict(format!("The ledger entry for order {id} is already settled"))
            },
        }
    }
}
