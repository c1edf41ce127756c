//! Catalog backend trait and implementations.
//!
//! This module defines the [`Catalog`] trait, the narrow persistence contract
//! the reconciliation engine depends on, and its implementations.

mod calibredb;
#[cfg(feature = "mock")]
mod mock;
mod sqlite;

pub use self::calibredb::CalibredbCatalog;
#[cfg(feature = "mock")]
pub use self::mock::{Call, MockCatalog};
pub use self::sqlite::SqliteCatalog;
use crate::error::Result;
use crate::item::{CatalogItem, ItemId};
use async_trait::async_trait;

/// Unified interface for catalog backends.
///
/// Exactly four operations: one full read and three targeted writes. Every
/// operation either succeeds or fails with an
/// [`Access`](crate::error::ErrorKind::Access) error carrying a readable
/// cause; callers are not expected to look deeper than that.
///
/// # Examples
///
/// ```
/// use tidyshelf_catalog::{Catalog, CatalogItem, error::Result};
///
/// async fn audiobooks(catalog: &dyn Catalog) -> Result<Vec<CatalogItem>> {
///     let items = catalog.list_items().await?;
///     Ok(items.into_iter().filter(CatalogItem::is_audiobook).collect())
/// }
/// ```
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Read a full snapshot of every item in the catalog, ordered by title.
    async fn list_items(&self) -> Result<Vec<CatalogItem>>;

    /// Delete the structured read-order value of an item.
    ///
    /// Succeeds without doing anything when the item has no value.
    async fn delete_read_order(&self, id: ItemId) -> Result<()>;

    /// Replace the complete tag list of an item.
    ///
    /// This is a full replace, not an incremental add/remove: tags missing
    /// from `tags` are unlinked from the item.
    async fn replace_tags(&self, id: ItemId, tags: &[String]) -> Result<()>;

    /// Set the title of an item.
    async fn update_title(&self, id: ItemId, title: &str) -> Result<()>;
}
