//! SQLite storage entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for one repository.
//! - Share a fixed set of connections per repository through `DbPool`.
//! - Install the reference schema for new repositories.
//!
//! # Invariants
//! - Opening a connection never alters schema; only `bootstrap` does.
//! - A closed pool hands out no further connections.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod bootstrap;
mod open;
mod pool;

pub use open::{open_db, open_db_in_memory};
pub use pool::DbPool;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    PoolClosed,
    PoolPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::PoolClosed => write!(f, "connection pool is closed"),
            Self::PoolPoisoned => write!(f, "connection pool lock is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::PoolClosed | Self::PoolPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
