//! Data models for storage operations.
//!
//! This module defines the symbol records produced by the source front-end
//! and stored in the `symbols` table.

use serde::{Deserialize, Serialize};

/// A symbol reported by the source front-end.
///
/// Line and column positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Stable cross-translation-unit identifier.
    pub usr: String,

    /// Cursor kind code.
    pub kind: u32,

    /// Spelling of the symbol.
    pub name: String,

    /// Spelling of the symbol's type, if it has one.
    #[serde(rename = "type")]
    pub type_name: Option<String>,

    /// Whether this cursor is the definition (not just a declaration).
    pub is_def: bool,

    /// Path of the file the symbol was found in.
    pub file: String,

    pub start_line: u32,

    pub start_col: u32,
}

impl Symbol {
    /// Create a new symbol declaration without a type.
    #[must_use]
    pub fn new(
        usr: impl Into<String>,
        kind: u32,
        name: impl Into<String>,
        file: impl Into<String>,
        start_line: u32,
        start_col: u32,
    ) -> Self {
        Self {
            usr: usr.into(),
            kind,
            name: name.into(),
            type_name: None,
            is_def: false,
            file: file.into(),
            start_line,
            start_col,
        }
    }

    /// Set the type spelling.
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Mark the symbol as a definition.
    #[must_use]
    pub const fn definition(mut self) -> Self {
        self.is_def = true;
        self
    }
}

/// A stored symbol with its row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Database primary key.
    pub id: i64,

    #[serde(flatten)]
    pub symbol: Symbol,
}
