//! Prepared statements: parameter binding and row iteration.
//!
//! Text and blob parameters are handed to the engine as transient values,
//! so `SQLite` copies the payload into memory owned by the statement before
//! [`Statement::bind`] returns. The caller's buffer is free to change from
//! then on. The engine releases its copy when the parameter is re-bound or
//! cleared, or when the statement is finalized on drop (including early
//! error returns).

use super::value::Value;
use crate::error::StorageError;
use crate::Result;

/// Returned by a row visitor to continue or stop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Break,
}

/// One decoded result row.
///
/// Text and blob values borrow the statement's row buffer and are only
/// valid until the visitor returns. Copy anything that must outlive it
/// (see [`Value::into_owned`]).
#[derive(Debug)]
pub struct Row<'r> {
    names: &'r [String],
    values: Vec<Value<'r>>,
}

impl<'r> Row<'r> {
    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names, in result order.
    #[must_use]
    pub const fn names(&self) -> &[String] {
        self.names
    }

    /// Decoded values, in result order.
    #[must_use]
    pub fn values(&self) -> &[Value<'r>] {
        &self.values
    }

    /// Value at a 0-based column index.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value<'r>> {
        self.values.get(index)
    }

    /// Value of the first column called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value<'r>> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
    }

    /// Iterate `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value<'r>)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// A compiled statement bound to one connection.
pub struct Statement<'conn> {
    stmt: rusqlite::Statement<'conn>,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn new(stmt: rusqlite::Statement<'conn>) -> Self {
        Self { stmt }
    }

    /// Number of `?` parameters in the statement.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.stmt.parameter_count()
    }

    /// Number of columns in each result row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.stmt.column_count()
    }

    /// Bind `value` to the parameter at 0-based `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidArgument`] for an index past the last
    /// parameter, [`StorageError::OutOfMemory`] if the engine cannot
    /// allocate its copy of the payload, or an engine error. On error the
    /// previous binding for `index` is left as it was.
    pub fn bind(&mut self, index: usize, value: &Value<'_>) -> Result<()> {
        let count = self.parameter_count();
        if index >= count {
            return Err(StorageError::invalid(format!(
                "parameter index {index} out of range for {count} parameters"
            ))
            .into());
        }

        self.stmt
            .raw_bind_parameter(index + 1, value)
            .map_err(|e| StorageError::engine("failed to bind parameter", &e))?;

        tracing::trace!(index, kind = ?value.kind(), "Bound parameter");
        Ok(())
    }

    /// Bind `values` to parameters `0..values.len()` in order.
    ///
    /// # Errors
    ///
    /// Returns the first binding error.
    pub fn bind_all(&mut self, values: &[Value<'_>]) -> Result<()> {
        let count = self.parameter_count();
        if values.len() != count {
            return Err(StorageError::invalid(format!(
                "statement takes {count} parameters, got {}",
                values.len()
            ))
            .into());
        }
        for (index, value) in values.iter().enumerate() {
            self.bind(index, value)?;
        }
        Ok(())
    }

    /// Reset every parameter to NULL, releasing the engine's copies.
    ///
    /// # Errors
    ///
    /// Returns an engine error if a parameter cannot be reset.
    pub fn clear_bindings(&mut self) -> Result<()> {
        for index in 1..=self.parameter_count() {
            self.stmt
                .raw_bind_parameter(index, rusqlite::types::Null)
                .map_err(|e| StorageError::engine("failed to clear binding", &e))?;
        }
        Ok(())
    }

    /// Column names, copied out of the statement.
    fn column_names(&self) -> Result<Vec<String>> {
        let count = self.stmt.column_count();
        let mut names = Vec::new();
        names
            .try_reserve_exact(count)
            .map_err(|e| StorageError::OutOfMemory(format!("column name buffer: {e}")))?;
        names.extend(self.stmt.column_names().into_iter().map(str::to_string));
        Ok(names)
    }

    /// Step through the result rows, handing each one to `visitor`.
    ///
    /// Iteration ends successfully when the rows are exhausted or the
    /// visitor returns [`LoopControl::Break`]. The statement is reset
    /// afterwards and keeps its bindings, so it can be run again.
    ///
    /// # Errors
    ///
    /// Returns an engine error if a step fails,
    /// [`StorageError::OutOfMemory`] if a row buffer cannot be allocated
    /// (the visitor is not called for that row),
    /// [`StorageError::Corrupted`] if a column cannot be decoded, or any
    /// error returned by `visitor`. Iteration stops at the first error.
    pub fn query<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&Row<'_>) -> Result<LoopControl>,
    {
        let names = self.column_names()?;
        let mut rows = self.stmt.raw_query();
        let mut delivered = 0usize;

        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(StorageError::engine("failed to step statement", &e).into()),
            };

            let mut values = Vec::new();
            values
                .try_reserve_exact(names.len())
                .map_err(|e| StorageError::OutOfMemory(format!("row decode buffer: {e}")))?;
            for (index, name) in names.iter().enumerate() {
                let value = row.get_ref(index).map_err(|e| {
                    StorageError::Corrupted(format!("column {index} ('{name}'): {e}"))
                })?;
                values.push(Value::from(value));
            }

            delivered += 1;
            let decoded = Row {
                names: &names,
                values,
            };
            if visitor(&decoded)? == LoopControl::Break {
                break;
            }
        }

        tracing::trace!(rows = delivered, "Query finished");
        Ok(())
    }

    /// Run a statement that produces no rows (INSERT, UPDATE, DELETE, DDL).
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns an engine error if stepping fails or the statement yields rows.
    pub fn execute(&mut self) -> Result<usize> {
        let changed = self
            .stmt
            .raw_execute()
            .map_err(|e| StorageError::engine("failed to execute statement", &e))?;
        tracing::trace!(changed, "Statement executed");
        Ok(changed)
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("parameters", &self.stmt.parameter_count())
            .field("columns", &self.stmt.column_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, CODE_INVAL};
    use crate::storage::{Database, ValueKind};

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.prepare("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, payload BLOB, score REAL)")
            .unwrap()
            .execute()
            .unwrap();
        db
    }

    fn insert(db: &Database, values: &[Value<'_>]) {
        let mut stmt = db
            .prepare("INSERT INTO items (label, payload, score) VALUES (?, ?, ?)")
            .unwrap();
        stmt.bind_all(values).unwrap();
        stmt.execute().unwrap();
    }

    fn collect(db: &Database, sql: &str) -> Vec<Vec<Value<'static>>> {
        let mut stmt = db.prepare(sql).unwrap();
        let mut out = Vec::new();
        stmt.query(|row| {
            out.push(row.values().iter().cloned().map(Value::into_owned).collect());
            Ok(LoopControl::Continue)
        })
        .unwrap();
        out
    }

    #[test]
    fn test_bind_index_is_zero_based() {
        let db = setup_db();
        let mut stmt = db
            .prepare("INSERT INTO items (label, score) VALUES (?, ?)")
            .unwrap();
        assert_eq!(stmt.parameter_count(), 2);
        stmt.bind(0, &Value::text("first")).unwrap();
        stmt.bind(1, &Value::Float(0.5)).unwrap();
        stmt.execute().unwrap();

        let rows = collect(&db, "SELECT label, score FROM items");
        assert_eq!(rows, vec![vec![Value::text("first").into_owned(), Value::Float(0.5)]]);
    }

    #[test]
    fn test_bind_out_of_range() {
        let db = setup_db();
        let mut stmt = db.prepare("SELECT * FROM items WHERE id = ?").unwrap();
        let err = stmt.bind(1, &Value::Integer(1)).unwrap_err();
        assert_eq!(err.code(), CODE_INVAL);
    }

    #[test]
    fn test_bind_all_arity_mismatch() {
        let db = setup_db();
        let mut stmt = db.prepare("SELECT * FROM items WHERE id = ?").unwrap();
        let err = stmt.bind_all(&[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_caller_buffer_may_change_after_bind() {
        let db = setup_db();
        let mut label = String::from("original");
        let mut payload = vec![1u8, 0, 2, 0];

        let mut stmt = db
            .prepare("INSERT INTO items (label, payload) VALUES (?, ?)")
            .unwrap();
        stmt.bind(0, &Value::text(&label)).unwrap();
        stmt.bind(1, &Value::blob(&payload)).unwrap();

        label.clear();
        label.push_str("clobbered");
        payload.fill(0xff);
        drop(payload);

        stmt.execute().unwrap();
        drop(stmt);

        let rows = collect(&db, "SELECT label, payload FROM items");
        assert_eq!(rows[0][0].as_str(), Some("original"));
        assert_eq!(rows[0][1].as_bytes(), Some(&[1u8, 0, 2, 0][..]));
    }

    #[test]
    fn test_rebind_replaces_value() {
        let db = setup_db();
        let mut stmt = db.prepare("SELECT ?").unwrap();
        stmt.bind(0, &Value::text("a")).unwrap();
        stmt.bind(0, &Value::Integer(3)).unwrap();

        let mut seen = Vec::new();
        stmt.query(|row| {
            seen.extend(row.values().iter().cloned().map(Value::into_owned));
            Ok(LoopControl::Continue)
        })
        .unwrap();
        assert_eq!(seen, vec![Value::Integer(3)]);
    }

    #[test]
    fn test_failed_bind_keeps_previous_value() {
        let db = setup_db();
        let mut stmt = db.prepare("SELECT ?").unwrap();
        stmt.bind(0, &Value::text("kept")).unwrap();
        assert!(stmt.bind(1, &Value::text("ignored")).is_err());

        let mut seen = None;
        stmt.query(|row| {
            seen = row.value(0).cloned().map(Value::into_owned);
            Ok(LoopControl::Break)
        })
        .unwrap();
        assert_eq!(seen, Some(Value::text("kept").into_owned()));
    }

    #[test]
    fn test_clear_bindings_resets_to_null() {
        let db = setup_db();
        let mut stmt = db.prepare("SELECT ?, ?").unwrap();
        stmt.bind(0, &Value::text("x")).unwrap();
        stmt.bind(1, &Value::Integer(2)).unwrap();
        stmt.clear_bindings().unwrap();

        let mut seen = Vec::new();
        stmt.query(|row| {
            seen.extend(row.values().iter().map(Value::kind));
            Ok(LoopControl::Continue)
        })
        .unwrap();
        assert_eq!(seen, vec![ValueKind::Null, ValueKind::Null]);
    }

    #[test]
    fn test_reuse_statement_for_several_rows() {
        let db = setup_db();
        let mut stmt = db
            .prepare("INSERT INTO items (label, score) VALUES (?, ?)")
            .unwrap();
        for (label, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            stmt.clear_bindings().unwrap();
            stmt.bind(0, &Value::text(label)).unwrap();
            stmt.bind(1, &Value::Float(score)).unwrap();
            assert_eq!(stmt.execute().unwrap(), 1);
        }
        drop(stmt);

        assert_eq!(collect(&db, "SELECT id FROM items").len(), 3);
    }

    #[test]
    fn test_row_decodes_runtime_types() {
        let db = setup_db();
        insert(
            &db,
            &[Value::text("t"), Value::blob(&[0, 1]), Value::Float(1.25)],
        );
        insert(&db, &[Value::Null, Value::Null, Value::Integer(7)]);

        let rows = collect(&db, "SELECT label, payload, score FROM items ORDER BY id");
        let kinds: Vec<Vec<ValueKind>> = rows
            .iter()
            .map(|r| r.iter().map(Value::kind).collect())
            .collect();
        assert_eq!(
            kinds,
            vec![
                vec![ValueKind::Text, ValueKind::Blob, ValueKind::Float],
                // REAL affinity turns 7 into 7.0
                vec![ValueKind::Null, ValueKind::Null, ValueKind::Float],
            ]
        );
    }

    #[test]
    fn test_row_names_and_lookup() {
        let db = setup_db();
        insert(&db, &[Value::text("named"), Value::Null, Value::Float(2.0)]);

        let mut stmt = db.prepare("SELECT id, label FROM items").unwrap();
        let mut checked = false;
        stmt.query(|row| {
            assert_eq!(row.len(), 2);
            assert_eq!(row.names(), &["id".to_string(), "label".to_string()]);
            assert_eq!(row.get("label").and_then(Value::as_str), Some("named"));
            assert!(row.get("missing").is_none());
            let pairs: Vec<&str> = row.iter().map(|(name, _)| name).collect();
            assert_eq!(pairs, vec!["id", "label"]);
            checked = true;
            Ok(LoopControl::Continue)
        })
        .unwrap();
        assert!(checked);
    }

    #[test]
    fn test_break_stops_after_first_row() {
        let db = setup_db();
        for _ in 0..5 {
            insert(&db, &[Value::text("dup"), Value::Null, Value::Null]);
        }

        let mut stmt = db.prepare("SELECT * FROM items").unwrap();
        let mut delivered = 0;
        stmt.query(|_| {
            delivered += 1;
            Ok(LoopControl::Break)
        })
        .unwrap();
        assert_eq!(delivered, 1);
    }

    #[test]
    fn test_visitor_error_stops_iteration() {
        let db = setup_db();
        for _ in 0..3 {
            insert(&db, &[Value::Null, Value::Null, Value::Null]);
        }

        let mut stmt = db.prepare("SELECT * FROM items").unwrap();
        let mut delivered = 0;
        let result = stmt.query(|_| {
            delivered += 1;
            Err(StorageError::Corrupted("visitor".to_string()).into())
        });
        assert!(result.is_err());
        assert_eq!(delivered, 1);
    }

    #[test]
    fn test_query_no_rows() {
        let db = setup_db();
        let mut stmt = db.prepare("SELECT * FROM items").unwrap();
        let mut delivered = 0;
        stmt.query(|_| {
            delivered += 1;
            Ok(LoopControl::Continue)
        })
        .unwrap();
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_step_failure_is_engine_error() {
        let db = setup_db();
        db.prepare("CREATE TABLE strict_items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)")
            .unwrap()
            .execute()
            .unwrap();

        let mut stmt = db
            .prepare("INSERT INTO strict_items (label) VALUES (?)")
            .unwrap();
        stmt.bind(0, &Value::Null).unwrap();
        let err = stmt.execute().unwrap_err();
        assert!(err.code() > 0);
        assert!(matches!(err, Error::Storage(StorageError::Engine { .. })));
    }

    #[test]
    fn test_query_step_failure_is_engine_error() {
        let db = setup_db();
        let mut stmt = db.prepare("SELECT abs(-9223372036854775808)").unwrap();
        let mut delivered = 0;
        let err = stmt
            .query(|_| {
                delivered += 1;
                Ok(LoopControl::Continue)
            })
            .unwrap_err();

        assert!(matches!(err, Error::Storage(StorageError::Engine { .. })));
        assert!(err.code() > 0);
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_statement_runs_again_after_query() {
        let db = setup_db();
        insert(&db, &[Value::text("x"), Value::Null, Value::Null]);

        let mut stmt = db.prepare("SELECT label FROM items WHERE label = ?").unwrap();
        stmt.bind(0, &Value::text("x")).unwrap();
        for _ in 0..2 {
            let mut count = 0;
            stmt.query(|_| {
                count += 1;
                Ok(LoopControl::Continue)
            })
            .unwrap();
            assert_eq!(count, 1);
        }
    }
}
