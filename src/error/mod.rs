//! Error types and Result aliases for symdb.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.
//!
//! Every error maps onto a single numeric code space: codes reported by the
//! `SQLite` engine are non-negative and passed through verbatim, while codes
//! owned by symdb itself are negative.

use thiserror::Error;

/// Result type alias using symdb's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Success.
pub const CODE_OK: i32 = 0;

/// A result column carried a value of an unrecognised type.
pub const CODE_CORRUPTED: i32 = CODE_OK - 1;

/// A bound payload copy or a row decode buffer could not be allocated.
pub const CODE_NOMEM: i32 = CODE_OK - 2;

/// A caller supplied an invalid argument.
pub const CODE_INVAL: i32 = CODE_OK - 3;

/// Generic engine failure (`SQLITE_ERROR`).
const ENGINE_GENERIC: i32 = 1;

/// Main error type for symdb operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database/storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The database could not be opened or its schema could not be prepared.
    #[error("failed to open '{path}': {message}")]
    Open {
        path: String,
        code: i32,
        message: String,
    },

    /// Error reported by the `SQLite` engine.
    #[error("database error: {message}")]
    Engine { code: i32, message: String },

    /// A buffer could not be allocated.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A row did not decode into the expected shape.
    #[error("corrupted data: {0}")]
    Corrupted(String),

    /// Record not found.
    #[error("not found: {entity} with id '{id}'")]
    NotFound { entity: &'static str, id: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Numeric code of this error.
    ///
    /// Engine failures keep the engine's extended result code; errors raised
    /// by symdb itself are negative.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Storage(e) => e.code(),
            Self::Config(_) => CODE_INVAL,
            Self::Io(_) | Self::Internal(_) => ENGINE_GENERIC,
        }
    }
}

impl StorageError {
    /// Wrap an engine error, prefixing its message with `context`.
    ///
    /// An engine allocation failure becomes [`StorageError::OutOfMemory`].
    pub fn engine(context: &str, err: &rusqlite::Error) -> Self {
        let code = engine_code(err);
        if code & 0xff == rusqlite::ffi::SQLITE_NOMEM {
            return Self::OutOfMemory(format!("{context}: {err}"));
        }
        Self::Engine {
            code,
            message: format!("{context}: {err}"),
        }
    }

    /// Wrap an engine error raised while opening `path`.
    pub fn open(path: impl Into<String>, err: &rusqlite::Error) -> Self {
        Self::Open {
            path: path.into(),
            code: engine_code(err),
            message: err.to_string(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Numeric code of this error.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Open { code, .. } | Self::Engine { code, .. } => *code,
            Self::OutOfMemory(_) => CODE_NOMEM,
            Self::InvalidArgument(_) => CODE_INVAL,
            Self::Corrupted(_) => CODE_CORRUPTED,
            Self::NotFound { .. } => ENGINE_GENERIC,
        }
    }
}

/// Extract the engine's extended result code from a rusqlite error.
fn engine_code(err: &rusqlite::Error) -> i32 {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => e.extended_code,
        _ => ENGINE_GENERIC,
    }
}
