//! Keeps the `(audiobook)` title marker in line with the `format:audiobook`
//! tag. The tag is never touched; only the title follows it.

use derive_more::Display;
use tidyshelf_catalog::CatalogItem;

/// Marker carried in the title of audiobook items.
pub const TITLE_MARKER: &str = "(audiobook)";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum TitleChange {
    #[display("[add audiobook to title]")]
    Marked(String),
    #[display("[remove audiobook from title]")]
    Unmarked(String),
}
impl TitleChange {
    pub fn title(&self) -> &str {
        match self {
            Self::Marked(title) | Self::Unmarked(title) => title,
        }
    }

    pub fn detail(&self) -> String {
        format!("to \"{}\"", self.title())
    }
}

/// The new title for `item`, if its marker disagrees with its tags.
///
/// A tagged item without the marker gets ` (audiobook)` before the first
/// colon, or at the end when there is none. An untagged item loses every
/// marker occurrence, and a `main: subtitle` title is reassembled around
/// the first colon.
pub fn reconcile_title(item: &CatalogItem) -> Option<TitleChange> {
    let marked = item.title.contains(TITLE_MARKER);
    match (item.is_audiobook(), marked) {
        (true, false) => Some(TitleChange::Marked(mark(&item.title))),
        (false, true) => {
            let title = unmark(&item.title);
            if title.is_empty() {
                tracing::warn!(id = %item.id, title = %item.title, "Title would be empty without the audiobook marker");
                return None;
            }
            Some(TitleChange::Unmarked(title))
        },
        _ => None,
    }
}

fn mark(title: &str) -> String {
    match title.split_once(':') {
        Some((main, subtitle)) => format!("{main} {TITLE_MARKER}:{subtitle}"),
        None => format!("{title} {TITLE_MARKER}"),
    }
}

fn unmark(title: &str) -> String {
    let stripped = title.replace(TITLE_MARKER, "");
    match stripped.split_once(':') {
        Some((main, subtitle)) if !subtitle.trim().is_empty() => format!("{}: {}", main.trim(), subtitle.trim()),
        Some((main, _)) => format!("{}:", main.trim()),
        None => stripped.trim().to_string(),
    }
}
