//! SQLite storage for tasks and dependency edges.
//!
//! Connections handed out by [`open_db`] are migrated to the latest schema and
//! have the task tables in place; nothing above this module touches
//! `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    /// `user_version` claims a schema whose tables are absent.
    MissingTable { table: &'static str, version: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "todo database is at schema {found}, this build supports up to {supported}"
            ),
            Self::MissingTable { table, version } => {
                write!(f, "schema {version} is recorded but table `{table}` is missing")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
