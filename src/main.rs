//! symdb - source-code symbol database
//!
//! Command-line front end over the symbol store. Results are printed to
//! stdout as JSON lines; logs go to stderr.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use symdb::error::StorageError;
use symdb::indexer::reindex_file;
use symdb::observability::{init_tracing, spans::db_span};
use symdb::storage::{
    add_symbol, count_symbols, delete_symbols_by_file, open_from_config, select_all_symbols,
    select_symbols_by_name, select_symbols_by_usr, Database, LoopControl, Row, Symbol,
    SymbolRecord, SYMBOLS_TABLE,
};
use symdb::{Config, Error, Result};

/// symdb - source-code symbol database
#[derive(Parser, Debug)]
#[command(name = "symdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the `SQLite` database file
    #[arg(short, long, env = "SYMDB_DATABASE", default_value = "./symbols.db")]
    database: PathBuf,

    /// Open the database without write access
    #[arg(long, env = "SYMDB_READ_ONLY")]
    read_only: bool,

    /// Fail instead of creating a missing database
    #[arg(long)]
    no_create: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SYMDB_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "SYMDB_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and its tables
    Init,

    /// Store one symbol
    Add {
        #[arg(long)]
        usr: String,
        #[arg(long)]
        kind: u32,
        #[arg(long)]
        name: String,
        /// Spelling of the symbol's type
        #[arg(long = "type")]
        type_name: Option<String>,
        /// Mark the symbol as a definition
        #[arg(long)]
        def: bool,
        #[arg(long)]
        file: String,
        #[arg(long, default_value = "1")]
        line: u32,
        #[arg(long, default_value = "1")]
        col: u32,
    },

    /// Print symbols with the given name
    Find {
        name: String,
        /// Treat the argument as a USR instead of a name
        #[arg(long)]
        usr: bool,
        /// Stop after this many results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print every stored symbol
    List,

    /// Print the number of stored symbols
    Count,

    /// Delete every symbol stored for a file
    Purge { file: String },

    /// Replace a file's symbols with JSON-line records read from stdin
    Reindex { file: String },
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    error: String,
    code: i32,
    kind: &'a str,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level, cli.log_json) {
        eprintln!("{e}");
    }

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "Command failed");
        let line = ErrorLine {
            error: e.to_string(),
            code: e.code(),
            kind: error_kind(&e),
        };
        if let Ok(json) = serde_json::to_string(&line) {
            eprintln!("{json}");
        }
        std::process::exit(e.code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config {
        database_path: cli.database,
        read_only: cli.read_only,
        create: !cli.no_create,
        log_level: cli.log_level,
        log_json: cli.log_json,
    };
    tracing::debug!(?config, "Configuration loaded");

    let db = open_from_config(&config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Init => {
            tracing::info!(path = %db.path(), "Database ready");
            emit(&mut out, &serde_json::json!({ "path": db.path() }))
        }
        Command::Add {
            usr,
            kind,
            name,
            type_name,
            def,
            file,
            line,
            col,
        } => {
            let _span = db_span("insert", SYMBOLS_TABLE).entered();
            let symbol = Symbol {
                usr,
                kind,
                name,
                type_name,
                is_def: def,
                file,
                start_line: line,
                start_col: col,
            };
            let id = add_symbol(&db, &symbol)?;
            emit(&mut out, &serde_json::json!({ "id": id }))
        }
        Command::Find { name, usr, limit } => {
            let _span = db_span("select", SYMBOLS_TABLE).entered();
            print_matches(&db, &mut out, &name, usr, limit)
        }
        Command::List => {
            let _span = db_span("select", SYMBOLS_TABLE).entered();
            select_all_symbols(&db, |row| {
                emit(&mut out, &SymbolRecord::from_row(row)?)?;
                Ok(LoopControl::Continue)
            })
        }
        Command::Count => {
            let count = count_symbols(&db)?;
            emit(&mut out, &serde_json::json!({ "count": count }))
        }
        Command::Purge { file } => {
            let _span = db_span("delete", SYMBOLS_TABLE).entered();
            let removed = delete_symbols_by_file(&db, &file)?;
            emit(&mut out, &serde_json::json!({ "removed": removed }))
        }
        Command::Reindex { file } => {
            let stdin = io::stdin();
            let stats = reindex_file(&db, &file, |record| {
                for (index, line) in stdin.lock().lines().enumerate() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let symbol: Symbol = serde_json::from_str(&line).map_err(|e| {
                        StorageError::invalid(format!("stdin line {}: {e}", index + 1))
                    })?;
                    record(&symbol)?;
                }
                Ok(())
            })?;
            emit(
                &mut out,
                &serde_json::json!({
                    "removed": stats.removed,
                    "inserted": stats.inserted,
                    "updated": stats.updated,
                    "skipped": stats.skipped,
                }),
            )
        }
    }
}

fn print_matches(
    db: &Database,
    out: &mut impl Write,
    key: &str,
    by_usr: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut printed = 0usize;
    let mut visitor = |row: &Row<'_>| -> Result<LoopControl> {
        if limit.is_some_and(|max| printed >= max) {
            return Ok(LoopControl::Break);
        }
        emit(&mut *out, &SymbolRecord::from_row(row)?)?;
        printed += 1;
        Ok(LoopControl::Continue)
    };

    if by_usr {
        select_symbols_by_usr(db, key, &mut visitor)
    } else {
        select_symbols_by_name(db, key, &mut visitor)
    }
}

fn emit<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| Error::internal(format!("failed to encode output: {e}")))?;
    writeln!(out, "{json}")?;
    Ok(())
}

const fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Config(_) => "config",
        Error::Io(_) => "io",
        Error::Internal(_) => "internal",
        Error::Storage(storage) => match storage {
            StorageError::Open { .. } => "open",
            StorageError::Engine { .. } => "engine",
            StorageError::OutOfMemory(_) => "out_of_memory",
            StorageError::InvalidArgument(_) => "invalid_argument",
            StorageError::Corrupted(_) => "corrupted",
            StorageError::NotFound { .. } => "not_found",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_flags_default() {
        let cli = Cli::try_parse_from(["symdb", "count"]).unwrap();
        assert_eq!(cli.log_level, "warn");
        assert!(!cli.log_json);
        assert!(matches!(cli.command, Command::Count));
    }

    #[test]
    fn test_log_flags_override() {
        let cli =
            Cli::try_parse_from(["symdb", "--log-level", "debug", "--log-json", "list"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(cli.log_json);
    }

    #[test]
    fn test_find_options() {
        let cli = Cli::try_parse_from(["symdb", "find", "c:@F@main", "--usr", "--limit", "2"])
            .unwrap();
        match cli.command {
            Command::Find { name, usr, limit } => {
                assert_eq!(name, "c:@F@main");
                assert!(usr);
                assert_eq!(limit, Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
