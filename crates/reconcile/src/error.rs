//! Reconcile Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Catalog errors are kept as children
//! of the kind raised here.

use derive_more::{Display, Error};
use tidyshelf_catalog::ItemId;

/// A reconciliation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The catalog snapshot could not be read; nothing was changed.
    #[display("could not load catalog items")]
    Load,
    /// Writing the corrections for one item failed. Items processed before
    /// it keep their changes.
    #[display("could not apply corrections to item {_0}")]
    Apply(#[error(not(source))] ItemId),
    #[display("reconciliation ended without a summary")]
    Incomplete,
}
