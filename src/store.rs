//! Identity-mapping store: one SQLite table linking a Discord subject id to
//! the FSO username registered through the gateway.
//!
//! Rows are created exactly once, on successful external registration, and
//! are never updated or deleted. The table is created if absent at startup.
//! The public API centers around [`IdentityStore`], a thread-safe handle
//! (`Arc<Mutex<Connection>>`) cloned into every request handler; the
//! [`MappingStore`] trait is the seam the flow controller is written against.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS identity_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    discord_id TEXT NOT NULL UNIQUE,
    fso_username TEXT NOT NULL
)";

/// Errors that can occur while reading or writing identity mappings.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A mapping already exists for this subject id.
    #[error("a mapping for this account already exists")]
    Duplicate,
}

/// A persisted link between a Discord subject id and an FSO username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMapping {
    /// Surrogate key, assigned on insert.
    pub id: i64,
    pub discord_id: String,
    pub fso_username: String,
}

/// Lookup/insert contract the flow controller is written against.
pub trait MappingStore: Send + Sync {
    fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<IdentityMapping>, StoreError>;
    fn insert(&self, discord_id: &str, fso_username: &str) -> Result<IdentityMapping, StoreError>;
}

#[derive(Clone)]
pub struct IdentityStore(Arc<Mutex<Connection>>);

impl IdentityStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self(Arc::new(Mutex::new(conn))))
    }
}

impl MappingStore for IdentityStore {
    fn find_by_discord_id(&self, discord_id: &str) -> Result<Option<IdentityMapping>, StoreError> {
        let conn = self.0.lock();
        let row = conn
            .query_row(
                "SELECT id, discord_id, fso_username FROM identity_mappings WHERE discord_id = ?1",
                params![discord_id],
                |row| {
                    Ok(IdentityMapping {
                        id: row.get(0)?,
                        discord_id: row.get(1)?,
                        fso_username: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn insert(&self, discord_id: &str, fso_username: &str) -> Result<IdentityMapping, StoreError> {
        let conn = self.0.lock();
        match conn.execute(
            "INSERT INTO identity_mappings (discord_id, fso_username) VALUES (?1, ?2)",
            params![discord_id, fso_username],
        ) {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                debug!(target: "store", "mapping inserted id={} discord_id={}", id, discord_id);
                Ok(IdentityMapping {
                    id,
                    discord_id: discord_id.to_string(),
                    fso_username: fso_username.to_string(),
                })
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                Err(StoreError::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }
}
