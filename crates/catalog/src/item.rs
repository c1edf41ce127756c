use crate::tags::{self, AUDIOBOOK_TAG};
use derive_more::Display;
use std::fmt::{Display as FmtDisplay, Formatter, Result as FmtResult};

/// Textual form of an unset read order, kept for compatibility with the
/// companion tool's text fields and the tool's own output.
pub const NO_READORDER: &str = "no-readorder";
/// Structured value that instructs the tool to delete the read order.
pub const CLEAR_READORDER: &str = "0.0";

/// Identity of a catalog item, assigned by the catalog store.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);
impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The structured read-order field of an item.
///
/// Values are opaque strings: `"2.0"` and `"2"` are different values, and a
/// non-numeric value is compared and copied as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ReadOrder {
    /// No structured value is set.
    #[default]
    Unset,
    /// A structured value, possibly the [clear instruction](CLEAR_READORDER).
    Value(String),
}
impl ReadOrder {
    /// Interpret a raw field value read from the catalog; missing and blank
    /// values are both [`Unset`](Self::Unset).
    pub fn from_field(value: Option<impl Into<String>>) -> Self {
        match value.map(Into::into) {
            Some(value) if !value.trim().is_empty() => Self::Value(value.trim().to_string()),
            _ => Self::Unset,
        }
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Unset => None,
            Self::Value(value) => Some(value),
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Exact string match on `"0.0"`; `"0"` or `"0.00"` are ordinary values.
    pub fn is_clear_instruction(&self) -> bool {
        self.as_value() == Some(CLEAR_READORDER)
    }
}
impl FmtDisplay for ReadOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_value().unwrap_or(NO_READORDER))
    }
}
impl<S: Into<String>> From<Option<S>> for ReadOrder {
    fn from(value: Option<S>) -> Self {
        Self::from_field(value)
    }
}
impl From<&str> for ReadOrder {
    fn from(value: &str) -> Self {
        Self::from_field(Some(value))
    }
}

/// Immutable snapshot of one catalog item, as read at the start of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    /// Trimmed tags, in the order the catalog returned them.
    pub tags: Vec<String>,
    pub read_order: ReadOrder,
}
impl CatalogItem {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>, tags: Vec<String>, read_order: ReadOrder) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tags: tags.into_iter().map(|tag| tag.trim().to_string()).filter(|tag| !tag.is_empty()).collect(),
            read_order,
        }
    }

    /// Build an item from the catalog's comma-separated tag representation.
    pub fn from_tag_list(id: impl Into<ItemId>, title: impl Into<String>, tags: &str, read_order: ReadOrder) -> Self {
        Self::new(id, title, tags::split(tags), read_order)
    }

    pub fn is_audiobook(&self) -> bool {
        self.tags.iter().any(|tag| tag == AUDIOBOOK_TAG)
    }

    /// Values of every `readorder:*` tag, in tag order.
    pub fn read_order_tags(&self) -> Vec<&str> {
        self.tags.iter().filter_map(|tag| tags::read_order_value(tag)).collect()
    }
}
