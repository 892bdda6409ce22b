//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Structured logging with JSON output option
//! - Configurable log levels (`RUST_LOG` overrides the given level)
//! - Spans for database operations and re-indexing passes

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

use crate::{Error, Result};

/// Initialize tracing with the given level and output format.
///
/// `RUST_LOG` overrides `level` when set. Logs go to stderr so that command
/// output on stdout stays machine-readable.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let installed = if json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);

        Registry::default().with(env_filter).with(fmt_layer).try_init()
    };
    installed.map_err(|e| Error::internal(format!("failed to initialize tracing: {e}")))?;

    tracing::debug!("Tracing initialized: level={}, json={}", level, json);
    Ok(())
}

/// Span constructors shared by the storage layer and the CLI.
pub mod spans {
    use tracing::{info_span, Span};

    /// Create a span for a database operation.
    ///
    /// # Arguments
    ///
    /// * `operation` - Type of operation (insert, select, purge, ...)
    /// * `table` - Database table name
    #[must_use]
    pub fn db_span(operation: &str, table: &str) -> Span {
        info_span!(
            "db_operation",
            operation = %operation,
            table = %table,
        )
    }

    /// Create a span covering one re-indexing pass.
    #[must_use]
    pub fn reindex_span(file: &str) -> Span {
        info_span!("reindex", file = %file)
    }
}
