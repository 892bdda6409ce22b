//! Symbol storage operations.
//!
//! The `symbols` table and the add / update / delete-by-file / select
//! operations on it, all built through the generic query builder.

use rusqlite::Connection;

use super::connection::Database;
use super::models::{Symbol, SymbolRecord};
use super::query::{Column, Query};
use super::schema::TableDescriptor;
use super::statement::{LoopControl, Row};
use super::value::Value;
use crate::error::StorageError;
use crate::Result;

/// SQL name of the symbols table.
pub const SYMBOLS_TABLE: &str = "symbols";

/// Descriptor registered by default in every [`TableRegistry`](super::TableRegistry).
#[must_use]
pub(crate) const fn descriptor() -> TableDescriptor {
    TableDescriptor::new(SYMBOLS_TABLE, init_symbols_table)
}

fn init_symbols_table(conn: &Connection, table: &TableDescriptor) -> Result<()> {
    let name = table.name;
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS {name} (
            id INTEGER PRIMARY KEY,
            usr TEXT NOT NULL,
            kind INTEGER NOT NULL,
            name TEXT NOT NULL,
            type TEXT,
            is_def INTEGER NOT NULL,
            file TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            start_col INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_{name}_name ON {name} (name);
        CREATE INDEX IF NOT EXISTS idx_{name}_file ON {name} (file);
        "
    ))
    .map_err(|e| StorageError::engine(&format!("failed to create table {name}"), &e))?;

    Ok(())
}

/// Reject symbols missing a required field.
fn validate(symbol: &Symbol) -> Result<()> {
    let missing = [
        ("usr", &symbol.usr),
        ("name", &symbol.name),
        ("file", &symbol.file),
    ]
    .into_iter()
    .find(|(_, value)| value.is_empty());

    match missing {
        Some((field, _)) => Err(StorageError::invalid(format!("symbol {field} is empty")).into()),
        None => Ok(()),
    }
}

/// Column list for a symbol, in table order.
fn columns(symbol: &Symbol) -> Vec<Column<'_>> {
    vec![
        Column::new("usr", symbol.usr.as_str()),
        Column::new("kind", symbol.kind),
        Column::new("name", symbol.name.as_str()),
        Column::new("type", Value::optional_text(symbol.type_name.as_deref())),
        Column::new("is_def", symbol.is_def),
        Column::new("file", symbol.file.as_str()),
        Column::new("start_line", symbol.start_line),
        Column::new("start_col", symbol.start_col),
    ]
}

fn required<'v>(row: &'v Row<'_>, column: &str) -> Result<&'v Value<'v>> {
    row.get(column)
        .ok_or_else(|| StorageError::Corrupted(format!("symbol row has no '{column}' column")).into())
}

fn int_column(row: &Row<'_>, column: &str) -> Result<i64> {
    required(row, column)?.as_i64().ok_or_else(|| {
        StorageError::Corrupted(format!("symbol column '{column}' is not an integer")).into()
    })
}

fn u32_column(row: &Row<'_>, column: &str) -> Result<u32> {
    u32::try_from(int_column(row, column)?).map_err(|_| {
        StorageError::Corrupted(format!("symbol column '{column}' out of range")).into()
    })
}

fn text_column(row: &Row<'_>, column: &str) -> Result<String> {
    required(row, column)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StorageError::Corrupted(format!("symbol column '{column}' is not text")).into())
}

impl SymbolRecord {
    /// Decode a row of the symbols table, copying it out of the row buffer.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if a column is missing or holds a
    /// value of the wrong type.
    pub fn from_row(row: &Row<'_>) -> Result<Self> {
        let type_name = match required(row, "type")? {
            Value::Null => None,
            value => Some(value.as_str().map(str::to_string).ok_or_else(|| {
                StorageError::Corrupted("symbol column 'type' is not text".to_string())
            })?),
        };

        Ok(Self {
            id: int_column(row, "id")?,
            symbol: Symbol {
                usr: text_column(row, "usr")?,
                kind: u32_column(row, "kind")?,
                name: text_column(row, "name")?,
                type_name,
                is_def: int_column(row, "is_def")? != 0,
                file: text_column(row, "file")?,
                start_line: u32_column(row, "start_line")?,
                start_col: u32_column(row, "start_col")?,
            },
        })
    }
}

/// Insert a symbol.
///
/// Returns the assigned ID.
///
/// # Errors
///
/// Returns an error if a required field is empty or the insertion fails.
pub fn add_symbol(db: &Database, symbol: &Symbol) -> Result<i64> {
    validate(symbol)?;
    db.execute(&Query::insert(SYMBOLS_TABLE, columns(symbol))?)?;

    let id = db.last_insert_id();
    tracing::trace!(id, usr = %symbol.usr, "Inserted symbol");
    Ok(id)
}

/// Insert multiple symbols.
///
/// Not transactional on its own; wrap the call in a transaction to make the
/// batch atomic.
///
/// # Errors
///
/// Returns an error if any insertion fails.
pub fn add_symbols_batch(db: &Database, symbols: &[Symbol]) -> Result<Vec<i64>> {
    let ids = symbols
        .iter()
        .map(|symbol| add_symbol(db, symbol))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(count = ids.len(), "Inserted symbol batch");
    Ok(ids)
}

/// Overwrite every column of the symbol with the given ID.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if no symbol has this ID, or an
/// error if the update fails.
pub fn update_symbol(db: &Database, id: i64, symbol: &Symbol) -> Result<()> {
    validate(symbol)?;
    let changed = db.execute(&Query::update_by_id(SYMBOLS_TABLE, id, columns(symbol))?)?;
    if changed == 0 {
        return Err(StorageError::not_found("symbol", id.to_string()).into());
    }

    tracing::trace!(id, usr = %symbol.usr, "Updated symbol");
    Ok(())
}

/// Delete all symbols found in a file.
///
/// Returns the number of symbols deleted.
///
/// # Errors
///
/// Returns an error if the deletion fails.
pub fn delete_symbols_by_file(db: &Database, file: &str) -> Result<usize> {
    let deleted = db.execute(&Query::delete(
        SYMBOLS_TABLE,
        vec![Column::new("file", file)],
    )?)?;

    tracing::debug!(file, deleted, "Deleted symbols for file");
    Ok(deleted)
}

/// Visit every symbol called `name`.
///
/// # Errors
///
/// Returns an error if the query fails or `visitor` returns one.
pub fn select_symbols_by_name<F>(db: &Database, name: &str, visitor: F) -> Result<()>
where
    F: FnMut(&Row<'_>) -> Result<LoopControl>,
{
    db.query(
        &Query::select(SYMBOLS_TABLE, vec![Column::new("name", name)])?,
        visitor,
    )
}

/// Visit every symbol with the given USR.
///
/// # Errors
///
/// Returns an error if the query fails or `visitor` returns one.
pub fn select_symbols_by_usr<F>(db: &Database, usr: &str, visitor: F) -> Result<()>
where
    F: FnMut(&Row<'_>) -> Result<LoopControl>,
{
    db.query(
        &Query::select(SYMBOLS_TABLE, vec![Column::new("usr", usr)])?,
        visitor,
    )
}

/// Visit every stored symbol.
///
/// # Errors
///
/// Returns an error if the query fails or `visitor` returns one.
pub fn select_all_symbols<F>(db: &Database, visitor: F) -> Result<()>
where
    F: FnMut(&Row<'_>) -> Result<LoopControl>,
{
    db.query(&Query::select(SYMBOLS_TABLE, Vec::new())?, visitor)
}

fn collect_records(
    select: impl FnOnce(&mut dyn FnMut(&Row<'_>) -> Result<LoopControl>) -> Result<()>,
) -> Result<Vec<SymbolRecord>> {
    let mut records = Vec::new();
    select(&mut |row| {
        records.push(SymbolRecord::from_row(row)?);
        Ok(LoopControl::Continue)
    })?;
    Ok(records)
}

/// Get all symbols called `name`.
///
/// # Errors
///
/// Returns an error if the query fails or a row does not decode.
pub fn find_symbols_by_name(db: &Database, name: &str) -> Result<Vec<SymbolRecord>> {
    collect_records(|visit| select_symbols_by_name(db, name, visit))
}

/// Get all symbols with the given USR.
///
/// # Errors
///
/// Returns an error if the query fails or a row does not decode.
pub fn find_symbols_by_usr(db: &Database, usr: &str) -> Result<Vec<SymbolRecord>> {
    collect_records(|visit| select_symbols_by_usr(db, usr, visit))
}

/// Get a symbol by ID.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if no symbol has this ID, or an
/// error if the query fails.
pub fn get_symbol(db: &Database, id: i64) -> Result<SymbolRecord> {
    let mut found = None;
    db.query(
        &Query::select(SYMBOLS_TABLE, vec![Column::new("id", id)])?,
        |row| {
            found = Some(SymbolRecord::from_row(row)?);
            Ok(LoopControl::Break)
        },
    )?;

    found.ok_or_else(|| StorageError::not_found("symbol", id.to_string()).into())
}

/// Count stored symbols.
///
/// # Errors
///
/// Returns an error if the query fails or the count does not decode.
pub fn count_symbols(db: &Database) -> Result<i64> {
    count_rows(
        db,
        &Query::raw(format!("SELECT COUNT(*) FROM {SYMBOLS_TABLE}"), Vec::new()),
    )
}

/// Run a single-row count query and decode its first column.
fn count_rows(db: &Database, query: &Query<'_>) -> Result<i64> {
    let mut count = None;
    db.query(query, |row| {
        let value = row.value(0).and_then(Value::as_i64).ok_or_else(|| {
            StorageError::Corrupted(format!("count is not an integer: {:?}", row.value(0)))
        })?;
        count = Some(value);
        Ok(LoopControl::Break)
    })?;

    count.ok_or_else(|| StorageError::Corrupted("count query returned no row".to_string()).into())
}
