//! SQLite-backed implementation of the directory and ranking repositories.
//!
//! ## Tables
//!
//! - `apps`, `submissions`, `submission_images` - directory and intake
//! - `ranking_dimensions`, `ranking_logs` - dimension catalog and its audit trail
//! - `ranking_configs`, `app_ranking_settings` - leaderboard definitions and opt-ins
//! - `app_dimension_scores`, `rankings`, `historical_rankings` - derived by synchronization

mod directory;
mod ranking;
pub mod schema;

use std::sync::{Mutex, MutexGuard};

use rusqlite::{ffi, Connection, ErrorCode};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::repository::RepositoryError;

/// One connection behind a mutex; every repository call holds it for its full duration.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `config.path`; `:memory:` opens a private database.
    pub fn open(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        if config.is_in_memory() {
            return Self::open_in_memory();
        }
        info!(path = ?config.path, "opening SQLite database");
        let conn = Connection::open(&config.path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        debug!("opening in-memory SQLite database");
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::init_schema(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Connection) -> Result<T, RepositoryError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut Connection) -> Result<T, RepositoryError>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::Unavailable(format!("connection lock poisoned: {e}")))
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::Conflict(format!("record already exists: {err}"))
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        RepositoryError::NotFound(format!("referenced record missing: {err}"))
                    }
                    _ => RepositoryError::Unavailable(err.to_string()),
                }
            }
            _ => RepositoryError::Unavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Unavailable(format!("invalid stored JSON: {err}"))
    }
}

/// Decode an enumerated text column through its `FromStr` impl.
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(column)?;
    raw.parse::<T>().map_err(|err| {
        let index = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
    })
}

/// `LIKE` pattern matching `needle` anywhere, with wildcards in the needle escaped.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests;
