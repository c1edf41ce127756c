//! Reconciliation rules and the batch engine for tidyshelf.
//!
//! Two independent concerns are reconciled per item:
//! - [`read_order`]: `readorder:<value>` tags against the structured
//!   read-order field, which always wins.
//! - [`audiobook`]: the `(audiobook)` title marker against the
//!   `format:audiobook` tag.
//!
//! Both rule sets are pure functions over a
//! [`CatalogItem`](tidyshelf_catalog::CatalogItem). The [`engine`] loads a
//! catalog snapshot, runs the selected rules on every item and writes the
//! corrections back through the [`Catalog`](tidyshelf_catalog::Catalog) trait.

pub mod audiobook;
pub mod engine;
pub mod error;
pub mod read_order;

pub use crate::engine::{ItemOutcome, Options, ReconcileEvent, Summary, reconcile, run};
