//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The catalog is missing something this tool needs before it can touch
    /// a single item (custom column, table, companion executable). Fix the
    /// configuration or the library, then run again.
    #[display("catalog misconfigured: {_0}")]
    Configuration(#[error(not(source))] String),
    /// A single read or write against the catalog failed.
    #[display("catalog access failed: {_0}")]
    Access(#[error(not(source))] String),
    /// The catalog returned data that could not be understood.
    #[display("invalid catalog data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` for errors raised before any item was processed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
