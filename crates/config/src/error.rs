//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration file not found: {_0}")]
    FileNotFound(#[error(not(source))] String),
    #[display("unsupported configuration file format: {_0} (expected toml, yaml or json)")]
    UnsupportedFormat(#[error(not(source))] String),
    #[display("no Calibre library configured (set `library`, TIDYSHELF_LIBRARY or --library)")]
    MissingLibrary,
    #[display("unknown backend `{_0}` (expected calibredb or sqlite)")]
    UnknownBackend(#[error(not(source))] String),
    #[display("invalid configuration")]
    Invalid,
    #[display("invalid configuration value for `{_0}`")]
    InvalidValue(#[error(not(source))] &'static str),
}
