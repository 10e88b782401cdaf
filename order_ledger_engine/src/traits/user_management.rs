use crate::{db_types::User, traits::LedgerStoreError};

/// Read-side queries over users.
#[allow(async_fn_in_trait)]
pub trait UserManagement: Clone {
    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, LedgerStoreError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, LedgerStoreError>;
}
