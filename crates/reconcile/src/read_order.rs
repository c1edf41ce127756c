//! Read-order reconciliation between `readorder:<value>` tags and the
//! structured read-order field.
//!
//! The structured field is authoritative. Rules, in evaluation order:
//!
//! 1. More than one `readorder:*` tag: keep the first, drop the rest.
//! 2. No tag but a field value: add `readorder:<field>`.
//! 3. Tag value differs from the field: rewrite the tag to the field.
//! 4. Field is the clear instruction (`0.0`): delete the field, and treat it
//!    as unset from here on.
//! 5. Field unset but a tag survives: remove the tag.
//!
//! Rules 2 and 3 are skipped for the clear instruction; rule 5 removes
//! whatever they would have written, so the result is the same.

use derive_more::Display;
use tidyshelf_catalog::tags::{self, read_order_tag};
use tidyshelf_catalog::{CatalogItem, ReadOrder};

/// A rule that fired for an item.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ReadOrderAction {
    /// Extra `readorder:*` tags were dropped; the first value was kept.
    #[display("[remove extra readorder tags]")]
    RemovedDuplicates { kept: String, removed: Vec<String> },
    #[display("[add readorder tag]")]
    AddedTag(String),
    #[display("[update readorder]")]
    UpdatedTag { from: String, to: String },
    #[display("[delete custom field readorder]")]
    ClearedField,
    #[display("[delete readorder tag]")]
    RemovedTag(String),
}
impl ReadOrderAction {
    /// Old and new values, for the actions that have them.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::UpdatedTag { from, to } => Some(format!("from \"{from}\" to \"{to}\"")),
            Self::RemovedTag(from) => Some(format!("from \"{from}\" to \"{}\"", ReadOrder::Unset)),
            Self::RemovedDuplicates { kept, removed } => {
                Some(format!("kept \"{kept}\", removed \"{}\"", removed.join("\", \"")))
            },
            Self::AddedTag(_) | Self::ClearedField => None,
        }
    }
}

/// What has to change for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOrderDecision {
    /// Non-readorder tags in their original order, then at most one
    /// `readorder:*` tag.
    pub final_tags: Vec<String>,
    /// The structured field must be deleted.
    pub clear_field: bool,
    /// `final_tags` differs from the current tags, ignoring order.
    pub tags_changed: bool,
    pub actions: Vec<ReadOrderAction>,
}
impl ReadOrderDecision {
    pub fn changed(&self) -> bool {
        self.clear_field || self.tags_changed || !self.actions.is_empty()
    }
}

/// Decide how the read-order tags and field of `item` must change.
///
/// Pure; the caller applies the decision.
pub fn reconcile(item: &CatalogItem) -> ReadOrderDecision {
    let found = item.read_order_tags();
    let mut actions = Vec::new();

    let mut surviving = found.first().map(|value| value.to_string());
    if let Some((kept, removed)) = found.split_first()
        && !removed.is_empty()
    {
        actions.push(ReadOrderAction::RemovedDuplicates {
            kept: kept.to_string(),
            removed: removed.iter().map(|value| value.to_string()).collect(),
        });
    }

    let mut field = item.read_order.clone();
    if field.is_clear_instruction() {
        actions.push(ReadOrderAction::ClearedField);
        field = ReadOrder::Unset;
    } else if let Some(value) = field.as_value() {
        match &surviving {
            None => actions.push(ReadOrderAction::AddedTag(value.to_string())),
            Some(tag) if tag != value => {
                actions.push(ReadOrderAction::UpdatedTag { from: tag.clone(), to: value.to_string() })
            },
            Some(_) => {},
        }
        surviving = Some(value.to_string());
    }
    let clear_field = item.read_order.is_clear_instruction();

    if !field.is_set()
        && let Some(tag) = surviving.take()
    {
        actions.push(ReadOrderAction::RemovedTag(tag));
    }

    let mut final_tags: Vec<String> =
        item.tags.iter().filter(|tag| tags::read_order_value(tag).is_none()).cloned().collect();
    final_tags.extend(surviving.as_deref().map(read_order_tag));
    let tags_changed = !tags::same_tags(&final_tags, &item.tags);

    ReadOrderDecision { final_tags, clear_field, tags_changed, actions }
}
