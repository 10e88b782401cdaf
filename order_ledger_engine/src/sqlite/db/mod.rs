//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an atomic transaction as
//! the need arises and call through to the functions without any other changes.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod entries;
pub mod orders;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/ledger_store.db";

pub fn db_url() -> String {
    let result = env::var("OLE_DATABASE_URL").unwrap_or_else(|_| {
        info!("OLE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);
    // SQLite is single-writer. The compound writes here begin deferred transactions that read before they write,
    // so a second pooled connection committing in between surfaces SQLITE_BUSY_SNAPSHOT (which busy_timeout cannot
    // retry). Cap the pool at one connection to serialize writers; callers still pass their desired ceiling.
    let pool = SqlitePoolOptions::new().max_connections(max_connections.min(1)).connect_with(options).await?;
    Ok(pool)
}
