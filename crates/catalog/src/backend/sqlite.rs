//! Direct SQLite catalog backend.
//!
//! Reads and writes the library's `metadata.db` with plain SQL. The
//! structured read order lives in a Calibre custom column whose table name
//! (`custom_column_<id>`) is only known after looking up the column's label,
//! so that lookup happens once when the backend is constructed.

use crate::backend::Catalog;
use crate::error::{ErrorKind, Result};
use crate::item::{CatalogItem, ItemId, ReadOrder};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// File name of the catalog database inside a Calibre library directory.
pub const DATABASE_FILE: &str = "metadata.db";
// Items are processed one after the other; a second connection would only
// ever sit idle.
const MAX_CONNECTIONS: u32 = 1;
const TABLE_PLACEHOLDER: &str = "{read_order_table}";

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    title: String,
    read_order: Option<String>,
}

/// Catalog backend operating directly on a Calibre `metadata.db`.
///
/// # Notes
/// - Calibre installs triggers on its tables that call SQL functions only
///   registered inside Calibre itself (e.g. `title_sort()` when a title
///   changes). Prefer the [`CalibredbCatalog`](super::CalibredbCatalog)
///   backend for libraries that still carry those triggers.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
    /// Name of the custom column table holding the structured read order.
    table: String,
}
impl SqliteCatalog {
    /// Open the catalog database of the library at `library`.
    ///
    /// Fails with [`ErrorKind::Configuration`] if the library has no
    /// database, or if the database has no custom column labelled `column`.
    pub async fn open(library: impl AsRef<Path>, column: impl AsRef<str>) -> Result<Self> {
        let path = library.as_ref().join(DATABASE_FILE);
        if !path.is_file() {
            exn::bail!(ErrorKind::Configuration(format!("no catalog database at {}", path.display())));
        }
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(false)
            // Calibre itself may hold the database open; wait a little for
            // its locks rather than failing the first write.
            .busy_timeout(Duration::from_millis(1500));
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Access(format!("could not open {}", path.display())))?;
        Self::with_pool(pool, column).await
    }

    /// Wrap an existing connection pool, discovering the read-order table.
    #[instrument(skip_all, fields(column = column.as_ref()))]
    pub async fn with_pool(pool: SqlitePool, column: impl AsRef<str>) -> Result<Self> {
        let label = column.as_ref();
        let column_id: Option<i64> = sqlx::query_scalar(include_str!("../../queries/find_custom_column.sql"))
            .bind(label)
            .fetch_optional(&pool)
            .await
            .or_raise(|| ErrorKind::Configuration("could not read custom column definitions".to_string()))?;
        let Some(column_id) = column_id else {
            exn::bail!(ErrorKind::Configuration(format!("custom column `{label}` not found")));
        };
        let table = format!("custom_column_{column_id}");
        let exists: i64 = sqlx::query_scalar(include_str!("../../queries/table_exists.sql"))
            .bind(&table)
            .fetch_one(&pool)
            .await
            .or_raise(|| ErrorKind::Configuration(format!("could not look up table `{table}`")))?;
        if exists == 0 {
            exn::bail!(ErrorKind::Configuration(format!("custom column `{label}` has no table `{table}`")));
        }
        tracing::debug!(table = %table, "Discovered read order column table");
        Ok(Self { pool, table })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Name of the custom column table holding the structured read order.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Close the connection pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn query_for_table(&self, query: &str) -> String {
        // The table name is built from an integer id, never from user input.
        query.replace(TABLE_PLACEHOLDER, &self.table)
    }

    fn bind_id(id: ItemId) -> Result<i64> {
        i64::try_from(id.0).or_raise(|| ErrorKind::InvalidData("item id"))
    }

    async fn tags_by_item(&self) -> Result<HashMap<i64, Vec<String>>> {
        let links: Vec<(i64, String)> = sqlx::query_as(include_str!("../../queries/list_tag_links.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Access("could not read tags".to_string()))?;
        let mut map: HashMap<i64, Vec<String>> = HashMap::new();
        for (book, name) in links {
            map.entry(book).or_default().push(name);
        }
        Ok(map)
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    fn name(&self) -> &str {
        "sqlite"
    }

    #[instrument(skip(self))]
    async fn list_items(&self) -> Result<Vec<CatalogItem>> {
        let query = self.query_for_table(include_str!("../../queries/list_items.sql"));
        let rows: Vec<ItemRow> = sqlx::query_as(&query)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Access("could not read items".to_string()))?;
        let mut tags = self.tags_by_item().await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let id = u64::try_from(row.id).or_raise(|| ErrorKind::InvalidData("item id"))?;
                let item_tags = tags.remove(&row.id).unwrap_or_default();
                Ok(CatalogItem::new(id, row.title, item_tags, ReadOrder::from_field(row.read_order)))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(items = items.len(), "Read catalog items");
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn delete_read_order(&self, id: ItemId) -> Result<()> {
        let query = self.query_for_table(include_str!("../../queries/delete_read_order.sql"));
        sqlx::query(&query)
            .bind(Self::bind_id(id)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Access(format!("could not delete read order of item {id}")))?;
        Ok(())
    }

    #[instrument(skip(self, tags), fields(tag_count = tags.len()))]
    async fn replace_tags(&self, id: ItemId, tags: &[String]) -> Result<()> {
        let book = Self::bind_id(id)?;
        let failed = || ErrorKind::Access(format!("could not replace tags of item {id}"));
        let mut tx = self.pool.begin().await.or_raise(failed)?;
        sqlx::query(include_str!("../../queries/unlink_tags.sql"))
            .bind(book)
            .execute(&mut *tx)
            .await
            .or_raise(failed)?;
        for tag in tags {
            let existing: Option<i64> = sqlx::query_scalar(include_str!("../../queries/find_tag.sql"))
                .bind(tag)
                .fetch_optional(&mut *tx)
                .await
                .or_raise(failed)?;
            let tag_id = match existing {
                Some(tag_id) => tag_id,
                None => {
                    tracing::debug!(tag = %tag, "Creating new tag");
                    sqlx::query(include_str!("../../queries/insert_tag.sql"))
                        .bind(tag)
                        .execute(&mut *tx)
                        .await
                        .or_raise(failed)?
                        .last_insert_rowid()
                },
            };
            sqlx::query(include_str!("../../queries/link_tag.sql"))
                .bind(book)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .or_raise(failed)?;
        }
        tx.commit().await.or_raise(failed)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_title(&self, id: ItemId, title: &str) -> Result<()> {
        sqlx::query(include_str!("../../queries/update_title.sql"))
            .bind(title)
            .bind(Self::bind_id(id)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Access(format!("could not update title of item {id}")))?;
        Ok(())
    }
}
