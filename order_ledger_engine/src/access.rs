//! Multi-tenant access scoping.
//!
//! The engine never performs authentication. The transport layer resolves its token into a [`Requester`] and every
//! service call is evaluated against it: non-elevated requesters are confined to resources they own, elevated
//! requesters see everything. Read paths apply [`Requester::owner_filter`] so that "does not exist" and "not yours"
//! are indistinguishable to the caller.

use serde::{Deserialize, Serialize};

use crate::db_types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Requester {
    pub fn new(user_id: i64) -> Self {
        Self { user_id, is_admin: false }
    }

    pub fn admin(user_id: i64) -> Self {
        Self { user_id, is_admin: true }
    }

    /// Whether this requester may act on a resource owned by `resource_owner`.
    ///
    /// Owners may act on their own resources unless the action demands elevation; elevated requesters may act on
    /// anything.
    pub fn can_act(&self, resource_owner: i64, required_elevation: bool) -> bool {
        if self.is_admin {
            return true;
        }
        !required_elevation && self.user_id == resource_owner
    }

    /// The owner id to scope queries by. `None` means "no filter" and is only ever returned for elevated requesters.
    pub fn owner_filter(&self) -> Option<i64> {
        if self.is_admin {
            None
        } else {
            Some(self.user_id)
        }
    }
}

impl From<&User> for Requester {
    fn from(user: &User) -> Self {
        Self { user_id: user.id, is_admin: user.is_admin }
    }
}
