//! SQLite handle shared by the ingestion pipeline.
//!
//! A [`Database`] wraps an `r2d2` pool and is cloned into every component that
//! stores rows (the queue, the ingestor and each folder walk). All operations
//! are short synchronous statements: a connection is taken from the pool,
//! used, and returned before the caller awaits anything. The in-memory
//! database has a single connection, so one held across an `.await` stalls
//! every concurrent file summary of a walk.

use crate::error::{DbError, DbResult};
use crate::migrations;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use tracing::{debug, info};

pub type ConnectionPool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Connections for an on-disk database. WAL lets readers (`status`, `show`,
/// the HTTP snapshot) run next to the walk that is writing.
const FILE_POOL_SIZE: u32 = 10;

/// Per-connection settings for an on-disk database.
const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA foreign_keys = ON;
     PRAGMA busy_timeout = 5000;";

/// Storage handle. Clones share one pool, so rows written through one clone
/// are visible through every other.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open (and migrate) the database file at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::Other(e.to_string()))?;
        }

        info!("Opening database at: {}", path.display());
        let manager =
            SqliteConnectionManager::file(path).with_init(|conn| conn.execute_batch(FILE_PRAGMAS));
        Self::from_manager(manager, FILE_POOL_SIZE)
    }

    /// Open a private in-memory database.
    ///
    /// Every SQLite memory connection is its own database, so the pool holds
    /// exactly one connection and all clones go through it.
    pub fn open_in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::from_manager(manager, 1)
    }

    fn from_manager(manager: SqliteConnectionManager, max_size: u32) -> DbResult<Self> {
        let pool = Pool::builder().max_size(max_size).build(manager)?;
        {
            let conn = pool.get()?;
            migrations::initialize_schema(&conn)?;
        }
        debug!("Database pool ready ({} connections)", max_size);
        Ok(Self { pool })
    }

    /// Take a connection from the pool. Drop it before the next `.await`.
    pub fn conn(&self) -> DbResult<PooledConn> {
        self.pool.get().map_err(DbError::from)
    }

    /// Size of the database file in bytes, as shown by `repowiki status`.
    pub fn file_size<P: AsRef<Path>>(path: P) -> DbResult<i64> {
        let metadata = std::fs::metadata(path).map_err(|e| DbError::Other(e.to_string()))?;
        Ok(metadata.len() as i64)
    }
}
