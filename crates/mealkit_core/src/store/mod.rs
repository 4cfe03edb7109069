//! Generic storage engine over one entity kind.
//!
//! # Responsibility
//! - Provide typed fetch/insert/update/delete primitives over SQLite tables.
//! - Keep SQL text generation in one place so repositories only describe
//!   filters, sort keys and field assignments.
//!
//! # Invariants
//! - Every mutating primitive runs in an immediate transaction that is
//!   committed before returning; a failed commit is returned as an error.
//! - Storage failures are never collapsed into "no result".

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod engine;
mod query;

pub use engine::{Entity, SqliteStore};
pub use query::{FetchRequest, Field, FieldValue, Filter, SortKey};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage engine error.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite failure, including commit failures.
    Db(DbError),
    /// A persisted row cannot be decoded into its entity.
    InvalidData(String),
    /// An entity cannot be encoded into column values.
    Encode(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Encode(message) => write!(f, "cannot encode entity: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::Encode(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
