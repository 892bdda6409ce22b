//! Incremental re-indexing of one source file.
//!
//! A pass deletes every symbol previously stored for the file and records
//! the symbols the front-end reports for it, all inside one transaction:
//! either the whole pass lands or the old symbol set stays untouched.
//!
//! Merge policy within a pass, keyed by USR:
//! - first sighting: insert
//! - a definition after a declaration: update the stored row in place
//! - anything else (repeated declarations, references): skip
//!
//! Symbols reported for other files (headers pulled in by the translation
//! unit) and symbols without a USR are skipped.

use std::collections::HashMap;

use crate::error::StorageError;
use crate::observability::spans::reindex_span;
use crate::storage::{add_symbol, delete_symbols_by_file, update_symbol, Database, Symbol};
use crate::Result;

/// Callback the front-end invokes once per declaration cursor.
///
/// Returning an error aborts the walk.
pub type SymbolCallback<'a> = dyn FnMut(&Symbol) -> Result<()> + 'a;

/// Counters for one re-indexing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexStats {
    /// Symbols deleted before recording started.
    pub removed: usize,
    pub inserted: usize,
    /// Declarations upgraded to definitions.
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug)]
struct Recorded {
    id: i64,
    is_def: bool,
}

/// An open re-indexing pass over one file.
///
/// Dropping the pass without calling [`finish`](Self::finish) rolls the
/// transaction back.
#[derive(Debug)]
pub struct FileReindexer<'db> {
    db: &'db Database,
    file: String,
    recorded: HashMap<String, Recorded>,
    stats: ReindexStats,
    open: bool,
}

impl<'db> FileReindexer<'db> {
    /// Start a transaction and delete the symbols stored for `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if `file` is empty, the transaction cannot start, or
    /// the deletion fails (the transaction is rolled back).
    pub fn begin(db: &'db Database, file: impl Into<String>) -> Result<Self> {
        let file = file.into();
        if file.is_empty() {
            return Err(StorageError::invalid("file path is empty").into());
        }

        db.begin()?;
        let mut pass = Self {
            db,
            file,
            recorded: HashMap::new(),
            stats: ReindexStats::default(),
            open: true,
        };
        pass.stats.removed = delete_symbols_by_file(db, &pass.file)?;

        tracing::debug!(file = %pass.file, removed = pass.stats.removed, "Re-index started");
        Ok(pass)
    }

    /// The file being re-indexed.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> ReindexStats {
        self.stats
    }

    /// Record one symbol reported by the front-end.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or update fails. The pass should then
    /// be dropped or aborted.
    pub fn record(&mut self, symbol: &Symbol) -> Result<()> {
        if symbol.usr.is_empty() || symbol.file != self.file {
            self.stats.skipped += 1;
            return Ok(());
        }

        match self.recorded.get_mut(&symbol.usr) {
            Some(prev) if symbol.is_def && !prev.is_def => {
                update_symbol(self.db, prev.id, symbol)?;
                prev.is_def = true;
                self.stats.updated += 1;
            }
            Some(_) => self.stats.skipped += 1,
            None => {
                let id = add_symbol(self.db, symbol)?;
                self.recorded.insert(
                    symbol.usr.clone(),
                    Recorded {
                        id,
                        is_def: symbol.is_def,
                    },
                );
                self.stats.inserted += 1;
            }
        }
        Ok(())
    }

    /// Commit the pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; the transaction is then rolled
    /// back.
    pub fn finish(mut self) -> Result<ReindexStats> {
        self.db.commit()?;
        self.open = false;

        tracing::info!(
            file = %self.file,
            removed = self.stats.removed,
            inserted = self.stats.inserted,
            updated = self.stats.updated,
            skipped = self.stats.skipped,
            "Re-index committed"
        );
        Ok(self.stats)
    }

    /// Roll the pass back explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub fn abort(mut self) -> Result<()> {
        self.open = false;
        self.db.rollback()?;
        tracing::debug!(file = %self.file, "Re-index aborted");
        Ok(())
    }
}

impl Drop for FileReindexer<'_> {
    fn drop(&mut self) {
        if self.open {
            match self.db.rollback() {
                Ok(()) => tracing::debug!(file = %self.file, "Re-index rolled back"),
                Err(e) => tracing::warn!(file = %self.file, error = %e, "Re-index rollback failed"),
            }
        }
    }
}

/// Re-index `file` with symbols produced by `walk`.
///
/// `walk` stands in for the front-end: it is handed the per-symbol callback
/// and must stop and return the callback's error as soon as one occurs.
/// The pass commits if `walk` succeeds and rolls back otherwise.
///
/// # Errors
///
/// Returns the first error raised by the pass or by `walk`.
pub fn reindex_file<W>(db: &Database, file: &str, walk: W) -> Result<ReindexStats>
where
    W: FnOnce(&mut SymbolCallback<'_>) -> Result<()>,
{
    let span = reindex_span(file);
    let _guard = span.enter();

    let mut pass = FileReindexer::begin(db, file)?;
    walk(&mut |symbol: &Symbol| pass.record(symbol))?;
    pass.finish()
}
