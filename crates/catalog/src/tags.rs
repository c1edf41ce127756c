//! Conventions for the free-form tag list.
//!
//! Tags are plain labels, but two of them carry meaning for this tool:
//! `readorder:<value>` mirrors the structured read-order column and
//! `format:audiobook` marks an item as an audiobook.

/// Prefix of tags that mirror the structured read-order value.
pub const READ_ORDER_PREFIX: &str = "readorder:";
/// Tag marking an item as an audiobook.
pub const AUDIOBOOK_TAG: &str = "format:audiobook";
/// Separator used by the catalog's external (textual) tag representation.
pub const SEPARATOR: char = ',';

/// Split the catalog's comma-separated tag representation into trimmed tags.
///
/// Blank entries (`"a,,b"`, trailing commas) are dropped.
pub fn split(tags: &str) -> Vec<String> {
    tags.split(SEPARATOR).map(str::trim).filter(|tag| !tag.is_empty()).map(str::to_string).collect()
}

/// Join tags back into the catalog's comma-separated representation.
pub fn join(tags: &[String]) -> String {
    tags.join(&SEPARATOR.to_string())
}

/// The value of a `readorder:<value>` tag, or `None` for any other tag.
///
/// The prefix match is case-sensitive and applied to the trimmed tag. The
/// value is kept as written, so `readorder: 2.0` carries `" 2.0"`.
pub fn read_order_value(tag: &str) -> Option<&str> {
    tag.trim().strip_prefix(READ_ORDER_PREFIX)
}

/// Build the `readorder:<value>` tag for a structured value.
pub fn read_order_tag(value: &str) -> String {
    format!("{READ_ORDER_PREFIX}{value}")
}

/// Order-insensitive comparison of two tag lists.
///
/// Reordering is not a change. Duplicates do count, so collapsing a repeated
/// tag is seen as a change and gets written back.
pub fn same_tags(a: &[String], b: &[String]) -> bool {
    let mut a: Vec<&str> = a.iter().map(String::as_str).collect();
    let mut b: Vec<&str> = b.iter().map(String::as_str).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn owned(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[rstest]
    #[case("tag1,readorder:2.0,tag2", &["tag1", "readorder:2.0", "tag2"])]
    #[case("tag1, tag2 ,  tag3", &["tag1", "tag2", "tag3"])]
    #[case("a,,b,", &["a", "b"])]
    #[case("", &[])]
    fn test_split(#[case] raw: &str, #[case] expected: &[&str]) {
        assert_eq!(split(raw), owned(expected));
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&owned(&["tag1", "readorder:2.0"])), "tag1,readorder:2.0");
        assert_eq!(join(&[]), "");
    }

    #[rstest]
    #[case("readorder:2.0", Some("2.0"))]
    #[case("  readorder:3.5 ", Some("3.5"))]
    #[case("readorder:", Some(""))]
    #[case("readorder: 2.0", Some(" 2.0"))]
    #[case("ReadOrder:2.0", None)]
    #[case("tag1", None)]
    #[case("format:audiobook", None)]
    fn test_read_order_value(#[case] tag: &str, #[case] expected: Option<&str>) {
        assert_eq!(read_order_value(tag), expected);
    }

    #[test]
    fn test_same_tags_ignores_order() {
        assert!(same_tags(&owned(&["a", "readorder:2.0", "b"]), &owned(&["a", "b", "readorder:2.0"])));
        assert!(!same_tags(&owned(&["a", "readorder:2.0"]), &owned(&["a", "readorder:3.0"])));
    }

    #[test]
    fn test_same_tags_counts_duplicates() {
        assert!(!same_tags(&owned(&["readorder:2.0", "readorder:2.0"]), &owned(&["readorder:2.0"])));
    }
}
