//! In-memory catalog backend for testing.

use crate::backend::Catalog;
use crate::error::{ErrorKind, Result};
use crate::item::{CatalogItem, ItemId, ReadOrder};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// A write recorded by [`MockCatalog`], in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DeleteReadOrder(ItemId),
    ReplaceTags(ItemId, Vec<String>),
    UpdateTitle(ItemId, String),
}

/// In-memory catalog backend for testing.
///
/// Writes are applied to the stored items, so a second pass over the same
/// catalog sees the result of the first, and every write is recorded as a
/// [`Call`].
///
/// # Examples
///
/// ```
/// use tidyshelf_catalog::backend::{Call, MockCatalog};
/// use tidyshelf_catalog::{Catalog, CatalogItem, ItemId, ReadOrder};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = MockCatalog::with_items([
///     CatalogItem::from_tag_list(1, "Dune", "scifi", ReadOrder::Unset),
/// ]);
/// catalog.update_title(ItemId(1), "Dune (audiobook)").await?;
/// assert_eq!(catalog.calls().await, vec![Call::UpdateTitle(ItemId(1), "Dune (audiobook)".to_string())]);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockCatalog {
    items: RwLock<BTreeMap<ItemId, CatalogItem>>,
    calls: RwLock<Vec<Call>>,
    failing: RwLock<BTreeSet<ItemId>>,
}

impl MockCatalog {
    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|item| (item.id, item)).collect()),
            ..Self::default()
        }
    }

    /// Make every write to `id` fail with an access error.
    pub async fn fail_on(&self, id: ItemId) {
        self.failing.write().await.insert(id);
    }

    /// Writes made so far.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.read().await.clone()
    }

    /// Current state of a single item.
    pub async fn item(&self, id: ItemId) -> Option<CatalogItem> {
        self.items.read().await.get(&id).cloned()
    }

    async fn write(&self, call: Call, apply: impl FnOnce(&mut CatalogItem)) -> Result<()> {
        let id = match &call {
            Call::DeleteReadOrder(id) | Call::ReplaceTags(id, _) | Call::UpdateTitle(id, _) => *id,
        };
        if self.failing.read().await.contains(&id) {
            exn::bail!(ErrorKind::Access(format!("item {id} is locked")));
        }
        let mut items = self.items.write().await;
        let Some(item) = items.get_mut(&id) else {
            exn::bail!(ErrorKind::Access(format!("item {id} does not exist")));
        };
        apply(item);
        self.calls.write().await.push(call);
        Ok(())
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>> {
        let mut items: Vec<CatalogItem> = self.items.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn delete_read_order(&self, id: ItemId) -> Result<()> {
        self.write(Call::DeleteReadOrder(id), |item| item.read_order = ReadOrder::Unset).await
    }

    async fn replace_tags(&self, id: ItemId, tags: &[String]) -> Result<()> {
        self.write(Call::ReplaceTags(id, tags.to_vec()), |item| item.tags = tags.to_vec()).await
    }

    async fn update_title(&self, id: ItemId, title: &str) -> Result<()> {
        self.write(Call::UpdateTitle(id, title.to_string()), |item| item.title = title.to_string()).await
    }
}
