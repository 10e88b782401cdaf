use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    traits::LedgerStoreError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, LedgerStoreError> {
    let result = sqlx::query_as("INSERT INTO users (username, is_admin) VALUES ($1, $2) RETURNING *;")
        .bind(user.username.clone())
        .bind(user.is_admin)
        .fetch_one(conn)
        .await;
    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerStoreError::DuplicateUser(user.username))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_user_by_username(username: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE username = $1").bind(username).fetch_optional(conn).await
}

/// Checks whether the user exists without loading the full row. Order creation validates its owner this way.
pub async fn user_exists(user_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(row.is_some())
}
