//! Database layer: the record store behind the scheduling engine.

mod schema;
mod animals;
mod catalog;
mod records;
mod veterinarians;

pub use schema::*;
#[allow(unused_imports)]
pub use animals::*;
#[allow(unused_imports)]
pub use catalog::*;
#[allow(unused_imports)]
pub use records::*;
#[allow(unused_imports)]
pub use veterinarians::*;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DbError {
    /// Whether this error is a unique-index collision, i.e. the store-level
    /// duplicate backstop fired.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
///
/// One `Database` owns one SQLite connection; callers that share it across
/// threads wrap it in a mutex, which also serializes apply operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction without taking `&mut self`, so the regular query
    /// methods stay usable inside the transactional scope. The apply pipeline
    /// relies on this for its check-then-insert sequence.
    pub fn begin(&self) -> DbResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }
}
