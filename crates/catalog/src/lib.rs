//! Calibre catalog access for tidyshelf.
//!
//! This crate owns the in-memory model of a catalog item ([`CatalogItem`]),
//! the conventions of the free-form tag list ([`tags`]) and the [`Catalog`]
//! trait through which items are read and corrections are written back.
//!
//! # Backends
//! - [`SqliteCatalog`](backend::SqliteCatalog): talks to the library's
//!   `metadata.db` directly.
//! - [`CalibredbCatalog`](backend::CalibredbCatalog): shells out to the
//!   `calibredb` companion tool.
//! - `MockCatalog` (feature `mock`): in-memory, for tests.

pub mod backend;
pub mod error;
mod item;
pub mod tags;

pub use crate::backend::Catalog;
pub use crate::item::{CLEAR_READORDER, CatalogItem, ItemId, NO_READORDER, ReadOrder};
use std::sync::Arc;

pub type CatalogHandle = Arc<dyn Catalog + Send + Sync>;
