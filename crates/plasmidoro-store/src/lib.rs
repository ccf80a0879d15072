//! SQLite persistence for the plasmid inventory.
//!
//! Every function takes a borrowed [`Connection`]; a `Transaction` derefs to
//! one, so callers decide the unit of atomicity.

pub mod dictionary;
pub mod info;
pub mod inventory;
pub mod models;
pub mod plasmids;
pub mod schema;

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

pub use dictionary::Dictionary;
pub use info::InfoTable;
pub use inventory::EntityKind;
pub use models::*;
pub use schema::init_db;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Open (creating if needed) the database at `path` and ensure the schema.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// A fresh in-memory database with the schema applied.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_db(&conn)?;
    Ok(conn)
}
