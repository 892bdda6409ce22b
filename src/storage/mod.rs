//! `SQLite` storage for source-code symbols.
//!
//! This module provides:
//! - Connection and transaction management
//! - Typed column values, parameter binding and row iteration
//! - A generic builder for simple equality-conditioned CRUD
//! - The `symbols` table and its repository operations

mod connection;
mod models;
mod query;
mod schema;
mod statement;
mod symbols;
mod value;

pub use connection::{Database, OpenOptions, SharedDatabase};
pub use models::{Symbol, SymbolRecord};
pub use query::{Column, Query};
pub use schema::{TableDescriptor, TableInit, TableRegistry};
pub use statement::{LoopControl, Row, Statement};
pub use symbols::{
    add_symbol, add_symbols_batch, count_symbols, delete_symbols_by_file, find_symbols_by_name,
    find_symbols_by_usr, get_symbol, select_all_symbols, select_symbols_by_name,
    select_symbols_by_usr, update_symbol, SYMBOLS_TABLE,
};
pub use value::{Value, ValueKind};

/// Open the database described by `config`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the database cannot
/// be opened.
pub fn open_from_config(config: &crate::Config) -> crate::Result<Database> {
    config.validate()?;
    Database::open(&config.database_path, config.open_options())
}
