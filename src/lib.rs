//! symdb
//!
//! Persistence layer for source-code symbols: a thin typed layer over
//! `SQLite` plus the repository and re-indexing logic for symbol records.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod indexer;
pub mod observability;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
