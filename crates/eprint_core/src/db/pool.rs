//! Fixed-size connection set shared by all requests against one repository.
//!
//! # Invariants
//! - Each connection is used by one caller at a time.
//! - In-memory databases always get exactly one connection.
//! - After `close`, every connection is dropped and checkouts fail.

use super::{open_db, open_db_in_memory, DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

const IN_MEMORY_DSN: &str = ":memory:";

pub struct DbPool {
    label: String,
    connections: Vec<Mutex<Option<Connection>>>,
    cursor: AtomicUsize,
    closed: AtomicBool,
}

impl DbPool {
    /// Opens `size` connections to the database at `dsn`.
    ///
    /// `:memory:` yields a single private in-memory connection.
    pub fn open(dsn: &str, size: usize) -> DbResult<Self> {
        if dsn.trim() == IN_MEMORY_DSN {
            return Ok(Self::from_connection(open_db_in_memory()?));
        }
        let path: PathBuf = Path::new(dsn.trim()).to_path_buf();
        let size = size.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            connections.push(Mutex::new(Some(open_db(&path)?)));
        }
        info!(
            "event=pool_open module=db status=ok dsn={} size={}",
            path.display(),
            size
        );
        Ok(Self {
            label: path.display().to_string(),
            connections,
            cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Wraps one already-open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            label: IN_MEMORY_DSN.to_string(),
            connections: vec![Mutex::new(Some(conn))],
            cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn size(&self) -> usize {
        self.connections.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs `f` against a checked-out connection.
    ///
    /// Prefers an idle connection starting from the round-robin cursor and
    /// waits on the cursor's slot when every connection is busy.
    ///
    /// # Errors
    /// - `PoolClosed` once `close` has run.
    /// - `PoolPoisoned` when a previous holder panicked.
    pub fn with_conn<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> DbResult<R> {
        if self.is_closed() {
            return Err(DbError::PoolClosed);
        }
        let mut guard = self.checkout()?;
        match guard.as_mut() {
            Some(conn) => Ok(f(conn)),
            None => Err(DbError::PoolClosed),
        }
    }

    /// Drops every connection; later checkouts fail with `PoolClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for slot in &self.connections {
            let mut guard = match slot.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take();
        }
        info!(
            "event=pool_close module=db status=ok dsn={} size={}",
            self.label,
            self.connections.len()
        );
    }

    fn checkout(&self) -> DbResult<MutexGuard<'_, Option<Connection>>> {
        let len = self.connections.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
        for offset in 0..len {
            match self.connections[(start + offset) % len].try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => return Err(DbError::PoolPoisoned),
            }
        }
        self.connections[start]
            .lock()
            .map_err(|_| DbError::PoolPoisoned)
    }
}
