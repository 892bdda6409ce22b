//! `SQLite` database connection management.
//!
//! Provides a connection wrapper that:
//! - Opens (and optionally creates) the database file
//! - Prepares every registered table inside one transaction
//! - Exposes explicit BEGIN / COMMIT / ROLLBACK
//!
//! A [`Database`] is driven by one thread at a time and does no locking of
//! its own. [`SharedDatabase`] adds an external mutex for callers that need
//! to hand one connection to several workers.

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Arc;

use super::query::Query;
use super::schema::TableRegistry;
use super::statement::{LoopControl, Row, Statement};
use crate::error::StorageError;
use crate::Result;

/// How a database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Open without write access. Schema preparation is skipped.
    pub read_only: bool,
    /// Create the file if it does not exist. Ignored when `read_only`.
    pub create: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            create: true,
        }
    }
}

impl OpenOptions {
    /// Read-write, creating the file if absent.
    #[must_use]
    pub const fn read_write() -> Self {
        Self {
            read_only: false,
            create: true,
        }
    }

    /// Read-only; the file must already exist.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_only: true,
            create: false,
        }
    }

    fn flags(self) -> OpenFlags {
        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if !self.read_only && self.create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    path: String,
    read_only: bool,
}

impl Database {
    /// Open a database at the given path and prepare the default schema.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened or the
    /// schema cannot be prepared. No connection is returned in that case.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        Self::open_with_registry(path, options, &TableRegistry::default())
    }

    /// Open a database and prepare every table in `registry`.
    ///
    /// When creating, missing parent directories are created too. A
    /// read-only open verifies the registered tables instead of creating
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened or the
    /// schema cannot be prepared. No connection is returned in that case.
    pub fn open_with_registry(
        path: impl AsRef<Path>,
        options: OpenOptions,
        registry: &TableRegistry,
    ) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if options.create && !options.read_only {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(path, options.flags())
            .map_err(|e| StorageError::open(path_str.clone(), &e))?;

        let db = Self {
            conn,
            path: path_str,
            read_only: options.read_only,
        };

        db.initialize(registry)?;
        tracing::info!(path = %db.path, read_only = db.read_only, "Database opened");

        Ok(db)
    }

    /// Open an in-memory database with the default schema, for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::open(":memory:", &e))?;

        let db = Self {
            conn,
            path: ":memory:".to_string(),
            read_only: false,
        };

        db.initialize(&TableRegistry::default())?;
        Ok(db)
    }

    /// Configure the connection and prepare (or verify) the schema.
    ///
    /// Any failure is reported as an open error; the caller drops `self`,
    /// which closes the native handle.
    fn initialize(&self, registry: &TableRegistry) -> Result<()> {
        let as_open_error = |e: crate::Error| -> crate::Error {
            let code = e.code();
            let message = match e {
                crate::Error::Storage(StorageError::Engine { message, .. }) => message,
                crate::Error::Storage(inner) => inner.to_string(),
                other => other.to_string(),
            };
            StorageError::Open {
                path: self.path.clone(),
                code,
                message,
            }
            .into()
        };

        if self.read_only {
            return registry.verify(&self.conn).map_err(as_open_error);
        }

        self.conn
            .execute_batch(
                "
                PRAGMA synchronous = NORMAL;
                PRAGMA temp_store = MEMORY;
                ",
            )
            .map_err(|e| StorageError::open(self.path.clone(), &e))?;

        self.with_transaction(|_| registry.prepare(&self.conn))
            .map_err(as_open_error)?;

        tracing::debug!(path = %self.path, tables = registry.len(), "Schema prepared");
        Ok(())
    }

    /// Close the connection, reporting any error the engine raises.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses to close the handle.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, e)| StorageError::engine("failed to close database", &e))?;
        tracing::debug!(path = %path, "Database closed");
        Ok(())
    }

    /// Start a transaction. Nested transactions are not supported.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the BEGIN.
    pub fn begin(&self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(|e| StorageError::engine("failed to begin transaction", &e))?;
        tracing::debug!("Transaction started");
        Ok(())
    }

    /// Commit the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the COMMIT.
    pub fn commit(&self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| StorageError::engine("failed to commit", &e))?;
        tracing::debug!("Transaction committed");
        Ok(())
    }

    /// Roll back the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the ROLLBACK.
    pub fn rollback(&self) -> Result<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| StorageError::engine("failed to roll back", &e))?;
        tracing::debug!("Transaction rolled back");
        Ok(())
    }

    /// Whether a transaction is currently open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits if `f` succeeds, rolls back if it fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails or if the function fails.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.begin()?;

        match f(self) {
            Ok(result) => {
                self.commit()?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Compile `sql` into a statement bound to this connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL does not compile.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        let stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| StorageError::engine("failed to prepare query", &e))?;
        tracing::trace!(sql, "Prepared statement");
        Ok(Statement::new(stmt))
    }

    /// Prepare a built query and bind its parameters.
    fn prepare_query(&self, query: &Query<'_>) -> Result<Statement<'_>> {
        let mut stmt = self.prepare(query.sql())?;
        stmt.bind_all(query.params())?;
        Ok(stmt)
    }

    /// Run a write query to completion.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if preparing, binding or stepping fails.
    pub fn execute(&self, query: &Query<'_>) -> Result<usize> {
        self.prepare_query(query)?.execute()
    }

    /// Run a query, handing each result row to `visitor`.
    ///
    /// # Errors
    ///
    /// Returns an error if preparing, binding, stepping or decoding fails,
    /// or if `visitor` returns one.
    pub fn query<F>(&self, query: &Query<'_>, visitor: F) -> Result<()>
    where
        F: FnMut(&Row<'_>) -> Result<LoopControl>,
    {
        self.prepare_query(query)?.query(visitor)
    }

    /// Row id of the most recent successful INSERT.
    #[must_use]
    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Get the database path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Check if the database is healthy.
    ///
    /// # Errors
    ///
    /// Returns an error if the health check fails.
    pub fn health_check(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| StorageError::engine("health check failed", &e).into())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

/// A [`Database`] behind a mutex, for sharing one connection across threads.
///
/// Clone is cheap - it just clones the Arc.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Execute a function with exclusive database access.
    ///
    /// # Errors
    ///
    /// Returns an error if the function fails.
    pub fn with_db<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let db = self.inner.lock();
        f(&db)
    }

    /// Hold the connection for several calls.
    pub fn lock(&self) -> MutexGuard<'_, Database> {
        self.inner.lock()
    }
}

impl std::fmt::Debug for SharedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDatabase").finish_non_exhaustive()
    }
}
