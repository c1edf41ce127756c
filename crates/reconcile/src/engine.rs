use crate::audiobook::{TitleChange, reconcile_title};
use crate::error::{ErrorKind, Result};
use crate::read_order::{self, ReadOrderDecision};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tidyshelf_catalog::{CatalogHandle, CatalogItem, ItemId};
use tracing::instrument;

/// Which concerns a pass processes, and whether it writes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub read_order: bool,
    pub audiobooks: bool,
    pub dry_run: bool,
}
impl Options {
    /// Build options from command-line style selector flags; selecting
    /// neither concern selects both.
    pub fn from_flags(read_order: bool, audiobooks: bool, dry_run: bool) -> Self {
        if !read_order && !audiobooks {
            return Self { read_order: true, audiobooks: true, dry_run };
        }
        Self { read_order, audiobooks, dry_run }
    }
}
impl Default for Options {
    fn default() -> Self {
        Self::from_flags(false, false, false)
    }
}

/// Everything that changes (or would change, in a dry run) for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub id: ItemId,
    /// Title as read from the catalog, before any change.
    pub title: String,
    pub title_change: Option<TitleChange>,
    pub read_order: Option<ReadOrderDecision>,
}
impl ItemOutcome {
    fn evaluate(item: &CatalogItem, options: Options) -> Self {
        let title_change = options.audiobooks.then(|| reconcile_title(item)).flatten();
        let read_order = options.read_order.then(|| read_order::reconcile(item)).filter(ReadOrderDecision::changed);
        Self { id: item.id, title: item.title.clone(), title_change, read_order }
    }

    pub fn changed(&self) -> bool {
        self.title_change.is_some() || self.read_order.is_some()
    }
}

/// Counts reported at the end of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Items read from the catalog.
    pub items: u64,
    /// Items with at least one change.
    pub changed: u64,
    pub audiobooks: u64,
    pub read_orders: u64,
    pub dry_run: bool,
}
impl Summary {
    fn record(&mut self, outcome: &ItemOutcome) {
        self.changed += u64::from(outcome.changed());
        self.audiobooks += u64::from(outcome.title_change.is_some());
        self.read_orders += u64::from(outcome.read_order.is_some());
    }
}
impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let verb = if self.dry_run { "to update (dry-run)" } else { "updated" };
        write!(
            f,
            "{} items {verb} ({} audiobook changes, {} readorder changes)",
            self.changed, self.audiobooks, self.read_orders
        )
    }
}

/// Progress events emitted by [`reconcile`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`Loaded`](Self::Loaded), exactly once, with the item count.
/// 3. [`Reconciled`](Self::Reconciled), once per item that needed a change.
/// 4. [`Complete`](Self::Complete), exactly once, with the totals.
///
/// An error ends the stream early and [`Complete`](Self::Complete) is never
/// emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    Started,
    Loaded(u64),
    /// An item was corrected (or would have been, in a dry run).
    Reconciled(ItemOutcome),
    Complete(Summary),
}

/// Streams [`ReconcileEvent`]s for one pass over every item in `catalog`.
///
/// The whole catalog is read first, then items are evaluated and corrected
/// one at a time. In a dry run nothing is written but every event and count
/// is the same. The first failed write ends the stream with an error; items
/// before it stay corrected.
pub fn reconcile(catalog: &CatalogHandle, options: Options) -> impl Stream<Item = Result<ReconcileEvent>> + '_ {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(ReconcileEvent::Started);

        let items = match catalog.list_items().await.or_raise(|| ErrorKind::Load) {
            Ok(items) => items,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        tracing::debug!(backend = catalog.name(), count = items.len(), "Loaded catalog items");
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        let mut summary = Summary {
            items: u64::try_from(items.len()).unwrap_or(0),
            dry_run: options.dry_run,
            ..Summary::default()
        };
        yield Ok(ReconcileEvent::Loaded(summary.items));

        for item in &items {
            let outcome = ItemOutcome::evaluate(item, options);
            if !outcome.changed() {
                tracing::trace!(id = %item.id, "Nothing to change");
                continue;
            }
            let applied = if options.dry_run { Ok(()) } else { apply(catalog, &outcome).await };
            if let Err(e) = applied {
                yield Err(e);
                return;
            }
            summary.record(&outcome);
            yield Ok(ReconcileEvent::Reconciled(outcome));
        }

        yield Ok(ReconcileEvent::Complete(summary));
    })
}

/// Drain a [`reconcile`] stream, returning the final [`Summary`].
pub async fn run(catalog: &CatalogHandle, options: Options) -> Result<Summary> {
    let events = reconcile(catalog, options);
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        if let ReconcileEvent::Complete(summary) = event? {
            return Ok(summary);
        }
    }
    exn::bail!(ErrorKind::Incomplete)
}

/// Write the changes of one item: title, then the structured field, then
/// the tags (only when they differ as a set).
#[instrument(skip_all, fields(id = %outcome.id))]
async fn apply(catalog: &CatalogHandle, outcome: &ItemOutcome) -> Result<()> {
    let id = outcome.id;
    if let Some(change) = &outcome.title_change {
        catalog.update_title(id, change.title()).await.or_raise(|| ErrorKind::Apply(id))?;
    }
    if let Some(decision) = &outcome.read_order {
        if decision.clear_field {
            catalog.delete_read_order(id).await.or_raise(|| ErrorKind::Apply(id))?;
        }
        if decision.tags_changed {
            catalog.replace_tags(id, &decision.final_tags).await.or_raise(|| ErrorKind::Apply(id))?;
        }
    }
    tracing::debug!("Applied corrections");
    Ok(())
}
