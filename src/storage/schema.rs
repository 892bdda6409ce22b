//! Table descriptors and schema preparation.
//!
//! Every table the store knows about is described by a [`TableDescriptor`]:
//! its SQL name and an initializer that creates it. Initializers use
//! `CREATE ... IF NOT EXISTS`, so preparing the schema on every open is safe.

use rusqlite::Connection;

use super::symbols;
use crate::error::StorageError;
use crate::Result;

/// Schema initializer for one table.
pub type TableInit = fn(&Connection, &TableDescriptor) -> Result<()>;

/// Maps a table to its SQL name and schema initializer.
#[derive(Debug, Clone, Copy)]
pub struct TableDescriptor {
    /// SQL name of the table. Trusted identifier, never escaped.
    pub name: &'static str,
    /// Idempotent initializer for the table and its indexes.
    pub init: TableInit,
}

impl TableDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, init: TableInit) -> Self {
        Self { name, init }
    }
}

/// The set of tables prepared when a connection opens.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    tables: Vec<TableDescriptor>,
}

impl Default for TableRegistry {
    /// Registry holding the symbols table.
    fn default() -> Self {
        Self {
            tables: vec![symbols::descriptor()],
        }
    }
}

impl TableRegistry {
    /// An empty registry.
    #[must_use]
    pub const fn empty() -> Self {
        Self { tables: Vec::new() }
    }

    /// Add a table to the registry.
    #[must_use]
    pub fn with_table(mut self, table: TableDescriptor) -> Self {
        self.tables.push(table);
        self
    }

    /// Look up a registered table by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Iterate registered tables in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Run every initializer in registration order.
    ///
    /// Callers are expected to wrap this in a transaction so a failing
    /// initializer leaves no partial schema behind.
    ///
    /// # Errors
    ///
    /// Returns the first initializer error.
    pub fn prepare(&self, conn: &Connection) -> Result<()> {
        for table in &self.tables {
            (table.init)(conn, table)?;
            tracing::debug!(table = table.name, "Table prepared");
        }
        Ok(())
    }

    /// Verify all registered tables exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any registered table is missing from the schema,
    /// or the engine error if the schema cannot be read.
    pub fn verify(&self, conn: &Connection) -> Result<()> {
        for table in &self.tables {
            let found = conn.query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?",
                [table.name],
                |_| Ok(()),
            );

            match found {
                Ok(()) => {}
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(StorageError::Engine {
                        code: rusqlite::ffi::SQLITE_ERROR,
                        message: format!("table '{}' not found", table.name),
                    }
                    .into());
                }
                Err(e) => return Err(StorageError::engine("failed to verify schema", &e).into()),
            }
        }

        tracing::debug!("Schema verification passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_notes(conn: &Connection, table: &TableDescriptor) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY, body TEXT)",
            table.name
        ))
        .map_err(|e| StorageError::engine("failed to create notes", &e))?;
        Ok(())
    }

    fn init_broken(conn: &Connection, _table: &TableDescriptor) -> Result<()> {
        conn.execute_batch("CREATE TABLE IF NOT EXISTS")
            .map_err(|e| StorageError::engine("failed to create broken", &e))?;
        Ok(())
    }

    #[test]
    fn test_default_registry_has_symbols() {
        let registry = TableRegistry::default();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(symbols::SYMBOLS_TABLE).is_some());
    }

    #[test]
    fn test_prepare_and_verify() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = TableRegistry::default().with_table(TableDescriptor::new("notes", init_notes));

        registry.prepare(&conn).unwrap();
        registry.verify(&conn).unwrap();
    }

    #[test]
    fn test_prepare_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = TableRegistry::default();

        registry.prepare(&conn).unwrap();
        registry.prepare(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [symbols::SYMBOLS_TABLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn test_verify_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = TableRegistry::default().verify(&conn).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_prepare_stops_at_first_failure() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = TableRegistry::empty()
            .with_table(TableDescriptor::new("broken", init_broken))
            .with_table(TableDescriptor::new("notes", init_notes));

        assert!(registry.prepare(&conn).is_err());
        assert!(TableRegistry::empty()
            .with_table(TableDescriptor::new("notes", init_notes))
            .verify(&conn)
            .is_err());
    }
}
